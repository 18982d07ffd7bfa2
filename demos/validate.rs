//! Load an instance and run calculation validation over its facts.

use crabrl::{load_instance_with_dts, validate_calculations, ValidationConfig};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <xbrl-instance-file>", args[0]);
        std::process::exit(1);
    }

    let (dts, instance) = load_instance_with_dts(args[1].as_ref())?;
    let errors = validate_calculations(&dts, &instance, &ValidationConfig::default());

    if errors.is_empty() {
        println!("✓ No calculation errors across {} facts", instance.facts().count());
    } else {
        println!("✗ {} calculation error(s)", errors.len());
        for e in &errors {
            println!("  {e}");
        }
    }

    Ok(())
}
