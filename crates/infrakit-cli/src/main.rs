//! Command line access to the infrakit VPC helpers.
//!
//! ```sh
//! infrakit --region us-east-2 used-cidrs
//! infrakit -v free-cidrs --count 3
//! infrakit --json account-id
//! ```
use clap::{Parser, Subcommand};
use kit::{aws, logger::LogLevel};

#[derive(Parser)]
#[command(name = "infrakit", version, about = "Query AWS for VPC address space and identity")]
struct Cli {
    /// Sets the verbosity level, repeat for more (-v info, -vv debug, -vvv trace).
    #[arg(short, action = clap::ArgAction::Count)]
    verbosity: u8,

    /// AWS region to query. Falls back to the default provider chain.
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the CIDR blocks held by VPCs in the region.
    UsedCidrs,
    /// Find `10.N.0.0/16` blocks that no VPC in the region holds yet.
    FreeCidrs {
        /// How many blocks to find.
        #[arg(long, short, default_value_t = 1)]
        count: usize,
    },
    /// Print the account id of the configured credentials.
    AccountId,
}

fn print_list<T: serde::Serialize + std::fmt::Display>(items: &[T], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        for item in items {
            println!("{item}");
        }
    }
    Ok(())
}

#[::tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        verbosity,
        region,
        json,
        command,
    } = Cli::parse();

    let level = LogLevel::from_verbosity(verbosity);
    kit::logger::builder(level)
        .filter_module("infrakit", level.into())
        .init();
    log::debug!("region override: {region:?}");

    let aws = aws::Aws::load(region.as_deref()).await?;
    match command {
        Command::UsedCidrs => {
            let used = aws::ec2::get_all_vpc_cidr_blocks(aws.as_ref()).await?;
            print_list(&used, json)?;
        }
        Command::FreeCidrs { count } => {
            let free = aws::ec2::find_available_vpc_cidr_blocks(count, aws.as_ref()).await?;
            print_list(&free, json)?;
        }
        Command::AccountId => {
            let account = aws::sts::get_account_id(aws.as_ref()).await?;
            if json {
                println!("{}", serde_json::json!({ "account": account }));
            } else {
                println!("{account}");
            }
        }
    }
    Ok(())
}
