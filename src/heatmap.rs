use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use antslam::{FieldSlice, GridPos, GridSimulation};
use png::{BitDepth, ColorType};

/// Edge length of one grid cell in the image, for grids that fit.
pub const CELL_PIXELS: u32 = 8;
/// Longest image edge before cells shrink below [`CELL_PIXELS`].
pub const MAX_EDGE: usize = 4096;

const NEST: [u8; 3] = [70, 130, 255];
const FOOD: [u8; 3] = [50, 210, 70];
const OBSTACLE: [u8; 3] = [110, 110, 110];
const AGENT: [u8; 3] = [235, 50, 50];

/// RGB rendering of one pheromone plane with the environment drawn on top.
#[derive(Debug, Clone)]
pub struct Heatmap {
    width: u32,
    height: u32,
    cell: u32,
    pixels: Vec<u8>,
}

impl Heatmap {
    /// Trail intensity scaled to the plane's maximum, dark where there is none.
    pub fn from_slice(slice: &FieldSlice) -> Result<Self, Box<dyn std::error::Error>> {
        let longest = slice.width.max(slice.height).max(1);
        let cell = (MAX_EDGE / longest).clamp(1, CELL_PIXELS as usize);
        let too_large = || format!("{}x{} plane is too large to render", slice.width, slice.height);

        let edge = |cells: usize| cells.checked_mul(cell).and_then(|px| u32::try_from(px).ok());
        let (Some(width), Some(height)) = (edge(slice.width), edge(slice.height)) else {
            return Err(too_large().into());
        };
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(3))
            .ok_or_else(too_large)?;
        let mut map = Self {
            width,
            height,
            cell: cell as u32,
            pixels: vec![0; bytes],
        };

        let peak = slice.max();
        for row in 0..slice.height {
            for col in 0..slice.width {
                let t = if peak > 0.0 { slice.at(col, row) / peak } else { 0.0 };
                let colour = [
                    (t * 255.0) as u8,
                    (t * 190.0) as u8,
                    (t * 60.0) as u8,
                ];
                map.fill_cell(col as u32, row as u32, colour);
            }
        }
        Ok(map)
    }

    /// The plane through the nest, with obstacles, food, the nest and the
    /// agents on that plane marked.
    pub fn from_simulation(sim: &GridSimulation) -> Result<Self, Box<dyn std::error::Error>> {
        let world = sim.world();
        let nest = world.nest();
        let mut map = Self::from_slice(&sim.pheromone_slice(2, nest.z)?)?;

        let on_plane = |p: &&GridPos| p.z == nest.z;
        for rock in world.obstacles().iter().filter(on_plane) {
            map.fill_cell(rock.x as u32, rock.y as u32, OBSTACLE);
        }
        for food in world.food().iter().filter(on_plane) {
            map.fill_cell(food.x as u32, food.y as u32, FOOD);
        }
        map.fill_cell(nest.x as u32, nest.y as u32, NEST);
        for agent in sim.agents() {
            let at = agent.position();
            if at.z == nest.z {
                map.mark_centre(at.x as u32, at.y as u32, AGENT);
            }
        }
        Ok(map)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Edge length of one grid cell in this image.
    pub fn cell(&self) -> u32 {
        self.cell
    }

    fn fill_cell(&mut self, col: u32, row: u32, colour: [u8; 3]) {
        let cell = self.cell;
        for y in row * cell..(row + 1) * cell {
            for x in col * cell..(col + 1) * cell {
                self.put(x, y, colour);
            }
        }
    }

    // Half-size square so the cell underneath stays visible.
    fn mark_centre(&mut self, col: u32, row: u32, colour: [u8; 3]) {
        let cell = self.cell;
        let inset = cell / 4;
        for y in row * cell + inset..(row + 1) * cell - inset {
            for x in col * cell + inset..(col + 1) * cell - inset {
                self.put(x, y, colour);
            }
        }
    }

    fn put(&mut self, x: u32, y: u32, colour: [u8; 3]) {
        if x < self.width && y < self.height {
            let idx = (y as usize * self.width as usize + x as usize) * 3;
            self.pixels[idx..idx + 3].copy_from_slice(&colour);
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::create(path)?;
        let w = BufWriter::new(file);

        let mut encoder = png::Encoder::new(w, self.width, self.height);
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        Ok(())
    }
}
