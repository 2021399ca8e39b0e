//! Diff command - compare two cluster templates

use console::style;
use std::path::Path;

use crate::display::render_diff;
use crate::error::Result;
use crate::util::read_input;

pub fn run(old: &Path, new: &Path) -> Result<()> {
    let old_stream = read_input(old)?;
    let new_stream = read_input(new)?;

    if omni_core::yaml_equivalent(&old_stream, &new_stream)? {
        println!("{} Templates are equivalent", style("✓").green());
        if old_stream != new_stream {
            println!("  {}", style("(formatting differs)").dim());
        }
        return Ok(());
    }

    println!(
        "{} Templates differ: {} → {}",
        style("✗").yellow(),
        old.display(),
        new.display()
    );
    print!("{}", render_diff(&old_stream, &new_stream));
    Ok(())
}
