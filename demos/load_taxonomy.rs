//! Build a DTS from a root schema and time how long discovery takes.

use crabrl::create_dts;
use std::env;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <root-schema.xsd>", args[0]);
        std::process::exit(1);
    }

    let start = Instant::now();
    let dts = create_dts(args[1].as_ref())?;
    let elapsed = start.elapsed();

    println!("Discovered DTS from {}", args[1]);
    println!("  Schemas:            {}", dts.schemas.len());
    println!("  Concepts:           {}", dts.concepts.len());
    println!("  Presentation roles: {}", dts.presentation_trees.roles().count());
    println!("  Hypercubes:         {}", dts.dimensions.hypercube_count());
    println!("  Time:               {:.2}ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}
