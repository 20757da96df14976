//! Primary entrypoint for the `commercetxt` CLI binary.

use anyhow::Result;

fn main() -> Result<()> {
    let code = commercetxt_cli::run()?;
    std::process::exit(code);
}
