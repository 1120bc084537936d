use anyhow::Result;
use clap::Subcommand;

use catalog_access::config::QueryConfig;
use catalog_access::model::{OrderId, OrderView};
use catalog_access::service::OrderService;

use super::{parse_view, SearchArgs};
use crate::fixture::Fixture;
use crate::output;

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Search orders by user, status and order date
    Search {
        #[command(flatten)]
        args: SearchArgs,

        /// Relations to load: root, with_user, with_items, full
        #[arg(long, default_value = "root", value_parser = parse_view::<OrderView>)]
        view: OrderView,
    },
    /// Show one order with its line items
    Get {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long, default_value = "full", value_parser = parse_view::<OrderView>)]
        view: OrderView,
    },
}

pub async fn execute(command: OrderCommands, fixture: Fixture, query: QueryConfig) -> Result<()> {
    let service = OrderService::new(fixture.order_store(), query);

    match command {
        OrderCommands::Search { args, view } => {
            let page = service.search(&args.to_criteria(), view).await?;
            output::print_page(&page)
        }
        OrderCommands::Get { id, view } => {
            let order = service.find_by_id(OrderId::new(id), view).await?;
            output::print_json(&order)?;
            eprintln!("total {}", order.total());
            Ok(())
        }
    }
}
