//! Templates Command
//!
//! List the built-in report section templates.

use console::style;

use crate::template::TemplateRegistry;
use crate::types::Result;

pub fn run() -> Result<()> {
    let registry = TemplateRegistry::with_builtins();

    println!("{} templates available:", registry.len());
    println!();

    for template in registry.list() {
        println!(
            "  {}  {}",
            style(&template.id).cyan().bold(),
            template.title
        );
    }

    println!();
    println!("Use: draftsmith draft <id> --param key=value");
    Ok(())
}
