use anyhow::Result;
use std::io::Write;

/// Handle the capabilities command
/// Plain object-by-object `push` and `fetch`; no refspec or option support
pub fn handle<W: Write>(output: &mut W) -> Result<()> {
    writeln!(output, "push")?;
    writeln!(output, "fetch")?;
    writeln!(output)?; // Empty line signals completion

    Ok(())
}
