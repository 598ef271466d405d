use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use log::info;
use parcel_server::data_objects::{BulkOrdersRequest, BulkStatusRequest};

use crate::{
    command_def::{Command, OrderSelection},
    formatting::{
        format_import_errors,
        format_order_view,
        format_orders,
        format_participants,
        format_status_change,
        format_statuses,
    },
    import_file::read_import_file,
    parcel_client::ParcelServerClient,
};

pub async fn handle_command(client: &ParcelServerClient, command: Command) -> Result<()> {
    use Command::*;
    match command {
        Health => {
            let reply = client.health().await?;
            println!("{client} says {}", reply.trim());
        },
        Status { order_id } => {
            let status = client.client_status(&order_id).await?;
            println!("{}", status.text);
        },
        Statuses => println!("{}", format_statuses(&client.statuses().await?)),
        Recent { limit } => println!("{}", format_orders(&client.recent_orders(limit).await?)),
        ByStatus { statuses } => println!("{}", format_orders(&client.orders_by_status(&statuses).await?)),
        Search { text } => println!("{}", format_orders(&client.search_orders(&text).await?)),
        Show { order_id } => println!("{}", format_order_view(&client.order_view(&order_id).await?)?),
        OrdersFor { username } => println!("{}", format_orders(&client.orders_for_participant(&username).await?)),
        SetStatus { order_id, status, force } => {
            let result = client.set_status(&order_id, status, force).await?;
            print!("{}", format_status_change(&result)?);
        },
        BulkStatus { status, orders } => {
            let request = BulkStatusRequest { orders: order_selection(orders)?, status };
            let result = client.bulk_status(&request).await?;
            println!("{}", result.summary);
        },
        BulkDelete { orders } => {
            let result = client.bulk_delete(&order_selection(orders)?).await?;
            println!("{}", result.summary);
        },
        Import { file } => import_orders(client, &file).await?,
        Unpaid => println!("{}", client.unpaid_report().await?.summary),
        Paid { order_id, username } => {
            let participant = client.toggle_paid(&order_id, &username).await?;
            println!("{}", format_participants(&[participant]));
        },
        Remind { order_id, message } => println!("{}", client.remind_unpaid(&order_id, message).await?.summary),
        Broadcast { message } => println!("{}", client.broadcast_reminders(message).await?.summary),
    }
    Ok(())
}

async fn import_orders(client: &ParcelServerClient, path: &Path) -> Result<()> {
    let rows = read_import_file(path)?;
    if rows.is_empty() {
        return Err(anyhow!("{} has no orders in it", path.display()));
    }
    info!("Importing {} rows from {}", rows.len(), path.display());
    let result = client.import_orders(&rows).await?;
    println!("{}", result.summary);
    let errors = format_import_errors(&result.report);
    if !errors.is_empty() {
        println!("\n{errors}");
    }
    Ok(())
}

fn order_selection(selection: OrderSelection) -> Result<BulkOrdersRequest> {
    let text = match &selection.ids_from {
        Some(path) => Some(fs::read_to_string(path).map_err(|e| anyhow!("Could not read {}. {e}", path.display()))?),
        None => None,
    };
    if selection.order_ids.is_empty() && text.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(anyhow!("No order ids were given"));
    }
    Ok(BulkOrdersRequest { order_ids: selection.order_ids, text })
}
