//! `quill tools`: list the built-in capabilities.

use quill_tools::CapabilityRegistry;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CapabilityRegistry::builtin();
    println!("{} built-in tools:", registry.len());
    println!();
    for spec in registry.list() {
        println!("  {}", spec.name);
        println!("    {}", spec.description);
        for param in spec.parameters {
            let marker = if param.required { "*" } else { " " };
            println!(
                "    {marker} {:<18} {:<8} {}",
                param.name,
                param.param_type.as_str(),
                param.description
            );
        }
        println!();
    }
    println!("  (* = required)");
    Ok(())
}
