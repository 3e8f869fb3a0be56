//! Service subcommand implementation.

use crate::services::service_name;
use clap::Parser;

/// Print the service label for one or more ports.
#[derive(Parser, Debug)]
pub struct ServiceCommand {
    /// Port numbers to look up
    #[arg(value_name = "PORT", required = true)]
    pub ports: Vec<u16>,
}

impl ServiceCommand {
    pub fn execute(&self) {
        for port in &self.ports {
            println!("{:>6}  {}", port, service_name(*port));
        }
    }
}
