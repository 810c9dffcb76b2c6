//! Config subcommand handlers.

use std::io::BufRead;

use pitu_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::{config_path, load_config};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = load_config(global)?;
            print!("{}", pitu_config::render_config(&cfg)?);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config_path(global).display());
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            pitu_config::save_config(&Config::default(), &path)?;
            println!("wrote {}", path.display());
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let password = line.trim_end_matches(['\r', '\n']);
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "empty password on stdin".into(),
                });
            }
            pitu_config::store_router_password(password)?;
            println!("router password stored in the system keyring");
            Ok(())
        }
    }
}
