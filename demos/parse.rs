//! Load an XBRL instance (and the DTS its `schemaRef` points at) and
//! print a summary of what was found.

use crabrl::load_instance_with_dts;
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <xbrl-instance-file>", args[0]);
        std::process::exit(1);
    }

    let (dts, instance) = load_instance_with_dts(args[1].as_ref())?;

    println!("Parsed {} successfully", args[1]);
    println!("  Schemas:  {}", dts.schemas.len());
    println!("  Concepts: {}", dts.concepts.len());
    println!("  Contexts: {}", instance.context_ids().count());
    println!("  Facts:    {}", instance.facts().count());

    for fact in instance.facts().take(5) {
        let concept = dts.concept(fact.concept);
        println!("  - {}: {}", concept.name, fact.value);
    }

    Ok(())
}
