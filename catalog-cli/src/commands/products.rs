use anyhow::Result;
use clap::Subcommand;

use catalog_access::config::QueryConfig;
use catalog_access::model::{ProductId, ProductView};
use catalog_access::service::ProductService;

use super::{parse_view, SearchArgs};
use crate::fixture::Fixture;
use crate::output;

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Search products
    Search {
        #[command(flatten)]
        args: SearchArgs,

        /// Relations to load: root, with_brand, with_category, with_images, full
        #[arg(long, default_value = "root", value_parser = parse_view::<ProductView>)]
        view: ProductView,
    },
    /// Show one product
    Get {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long, default_value = "full", value_parser = parse_view::<ProductView>)]
        view: ProductView,
    },
}

pub async fn execute(command: ProductCommands, fixture: Fixture, query: QueryConfig) -> Result<()> {
    let service = ProductService::new(fixture.product_store(), query);

    match command {
        ProductCommands::Search { args, view } => {
            let page = service.search(&args.to_criteria(), view).await?;
            output::print_page(&page)
        }
        ProductCommands::Get { id, view } => {
            let product = service.find_by_id(ProductId::new(id), view).await?;
            output::print_json(&product)
        }
    }
}
