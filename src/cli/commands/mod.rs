//! Command execution.
//!
//! Each command returns `Result<i32>`; errors are reported here once, with
//! recovery suggestions, and turned into exit code 1.

mod inspect;
mod package;
mod scaffold;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use inspect::execute_inspect;
use package::execute_package;
use scaffold::execute_scaffold;

/// Execute the command selected by the parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    if let Err(validation_error) = args.validate() {
        config.error_println(&validation_error.to_string());
        return Ok(1);
    }

    let command = args.command();
    let result = match &command {
        Command::Package => execute_package(&args, &config).await,
        Command::Scaffold { force } => execute_scaffold(&args, &config, *force).await,
        Command::Inspect => execute_inspect(&args, &config).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {}", command.name(), e));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() && !config.is_quiet() {
                config.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    config.println(&format!("  • {}", suggestion));
                }
            }

            Ok(1)
        }
    }
}
