use anyhow::Result;
use clap::Subcommand;

use catalog_access::config::QueryConfig;
use catalog_access::model::{UserId, UserView};
use catalog_access::service::UserService;

use super::{parse_view, SearchArgs};
use crate::fixture::Fixture;
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Search users
    Search {
        #[command(flatten)]
        args: SearchArgs,

        /// Relations to load: root, with_profile, with_addresses, with_orders, profile_and_addresses, full
        #[arg(long, default_value = "root", value_parser = parse_view::<UserView>)]
        view: UserView,
    },
    /// Show one user
    Get {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long, default_value = "full", value_parser = parse_view::<UserView>)]
        view: UserView,
    },
}

pub async fn execute(command: UserCommands, fixture: Fixture, query: QueryConfig) -> Result<()> {
    let service = UserService::new(fixture.user_store(), query);

    match command {
        UserCommands::Search { args, view } => {
            let page = service.search(&args.to_criteria(), view).await?;
            output::print_page(&page)
        }
        UserCommands::Get { id, view } => {
            let user = service.find_by_id(UserId::new(id), view).await?;
            output::print_json(&user)
        }
    }
}
