//! List rules command implementation.

use seam_lint_rules::RULES;

/// Runs the list-rules command.
pub fn run() {
    println!("Available rules:\n");
    println!("{:<10} {:<25} Description", "Code", "Name");
    println!("{}", "-".repeat(80));

    for rule in RULES {
        println!("{:<10} {:<25} {}", rule.code, rule.name, rule.description);
        if !rule.options.is_empty() {
            println!("{:<36} options: {}", "", rule.options.join(", "));
        }
    }

    println!("\nConfigure the interface in seam-lint.toml or on the command line, e.g.:");
    println!("  seam-lint check ./ssa --interface-package fakefmt --interface-name Printer");
}
