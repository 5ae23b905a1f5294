use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, String> {
    let mut cmd = C::command();
    let bin_name = cmd.get_name().to_owned();
    let mut out = std::io::stdout().lock();
    clap_complete::generate(shell, &mut cmd, bin_name, &mut out);
    out.flush()
        .map_err(|e| format!("failed to write completions: {e}"))?;
    Ok(EXIT_SUCCESS)
}
