//! # img-hash CLI
//!
//! Command-line interface for the perceptual hashing engine.
//!
//! ## Usage
//! ```bash
//! img-hash hash photo.jpg --algorithm all
//! img-hash compare a.jpg b.jpg --algorithm dhash --bits 32 --output json
//! ```

mod cli;

use phash_engine::Result;

fn main() -> Result<()> {
    cli::run()
}
