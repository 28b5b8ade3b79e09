use std::error::Error;
use std::process::Command;
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    let in_git_checkout = Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);

    let mut builder = EmitBuilder::builder();
    builder.build_timestamp();
    if in_git_checkout {
        builder.git_sha(true);
    }
    builder.emit()?;

    Ok(())
}
