use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use parcel_engine::order_objects::StatusChoice;

#[derive(Parser, Debug)]
#[command(version, about = "Staff tools for the parcel tracker")]
pub struct Arguments {
    /// The parcel server URL. Defaults to PARCEL_SERVER_URL.
    #[arg(short, long, global = true)]
    pub server: Option<String>,
    /// Your admin user id. Defaults to PARCEL_ADMIN_ID.
    #[arg(short, long, global = true)]
    pub admin: Option<i64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the server is up
    Health,
    /// Look up an order the way a client would
    Status {
        #[arg(required = true, index = 1)]
        order_id: String,
    },
    /// List the statuses with their numbers
    Statuses,
    /// The most recently updated orders
    Recent {
        #[arg(short = 'n', long, default_value = "10")]
        limit: u32,
    },
    /// Orders that currently have one of the given statuses
    #[clap(name = "by-status")]
    ByStatus {
        #[arg(required = true, num_args = 1..)]
        statuses: Vec<String>,
    },
    /// Orders whose note contains the text
    Search {
        #[arg(required = true, index = 1)]
        text: String,
    },
    /// An order with its participants
    Show {
        #[arg(required = true, index = 1)]
        order_id: String,
    },
    /// Orders a client participates in
    #[clap(name = "orders-for")]
    OrdersFor {
        #[arg(required = true, index = 1)]
        username: String,
    },
    /// Change the status of one order and notify its subscribers
    #[clap(name = "set-status")]
    SetStatus {
        #[arg(required = true, index = 1)]
        order_id: String,
        /// A status number (see `statuses`) or the full status text
        #[arg(required = true, index = 2, value_parser = parse_status_choice)]
        status: StatusChoice,
        /// Notify every subscriber, even those who were already sent this status
        #[arg(short, long)]
        force: bool,
    },
    /// Set one status on many orders
    #[clap(name = "bulk-status")]
    BulkStatus {
        /// A status number (see `statuses`) or the full status text
        #[arg(required = true, value_parser = parse_status_choice)]
        status: StatusChoice,
        #[command(flatten)]
        orders: OrderSelection,
    },
    /// Delete many orders
    #[clap(name = "bulk-delete")]
    BulkDelete {
        #[command(flatten)]
        orders: OrderSelection,
    },
    /// Import orders from a spreadsheet export (.tsv/.csv) or a JSON file
    Import {
        #[arg(required = true, index = 1)]
        file: PathBuf,
    },
    /// Unpaid participants, grouped by order
    Unpaid,
    /// Flip the paid flag of a participant
    Paid {
        #[arg(required = true, index = 1)]
        order_id: String,
        #[arg(required = true, index = 2)]
        username: String,
    },
    /// Send payment reminders to the unpaid participants of an order
    Remind {
        #[arg(required = true, index = 1)]
        order_id: String,
        /// Replaces the default reminder text
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Send payment reminders for every order with unpaid participants
    Broadcast {
        /// Replaces the default reminder text
        #[arg(short, long)]
        message: Option<String>,
    },
}

/// Order ids can be listed on the command line, read from a file of pasted text, or both.
#[derive(Debug, Args)]
pub struct OrderSelection {
    pub order_ids: Vec<String>,
    /// A file with order ids separated by spaces, commas or new lines
    #[arg(short = 'i', long = "ids-from")]
    pub ids_from: Option<PathBuf>,
}

pub fn parse_status_choice(s: &str) -> Result<StatusChoice, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("The status cannot be empty".to_string());
    }
    match s.parse::<usize>() {
        Ok(index) => Ok(StatusChoice::Index(index)),
        Err(_) => Ok(StatusChoice::Label(s.to_string())),
    }
}
