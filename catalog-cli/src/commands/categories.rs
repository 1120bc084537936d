use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use catalog_access::config::QueryConfig;
use catalog_access::model::{Category, CategoryId, CategoryView};
use catalog_access::service::{CategorySearchService, CategoryService};

use super::{parse_view, SearchArgs};
use crate::fixture::Fixture;
use crate::output;

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Search categories
    Search {
        #[command(flatten)]
        args: SearchArgs,

        /// Relations to load: root, with_parent, with_children, full
        #[arg(long, default_value = "root", value_parser = parse_view::<CategoryView>)]
        view: CategoryView,
    },
    /// Print the hierarchy
    Tree,
    /// Show ancestors and descendants of one category
    Lineage {
        #[arg(value_name = "ID")]
        id: i64,
    },
    /// Add a category, optionally under a parent
    Create {
        name: String,

        #[arg(long, value_name = "ID")]
        parent: Option<i64>,
    },
    /// Place CHILD under PARENT
    Attach {
        #[arg(value_name = "PARENT")]
        parent: i64,
        #[arg(value_name = "CHILD")]
        child: i64,
    },
    /// Move a category under a new parent, or to the top level without --parent
    Reparent {
        #[arg(value_name = "ID")]
        node: i64,

        #[arg(long, value_name = "ID")]
        parent: Option<i64>,
    },
    /// Detach CHILD from PARENT
    Detach {
        #[arg(value_name = "PARENT")]
        parent: i64,
        #[arg(value_name = "CHILD")]
        child: i64,
    },
    /// Delete a category; its children become top-level
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

pub async fn execute(command: CategoryCommands, fixture: Fixture, query: QueryConfig) -> Result<()> {
    let store = fixture.category_store();

    if let CategoryCommands::Search { args, view } = &command {
        let service = CategorySearchService::new(Arc::clone(&store), query);
        let page = service.search(&args.to_criteria(), *view).await?;
        return output::print_page(&page);
    }

    let hierarchy = CategoryService::load(store).await?;
    match command {
        CategoryCommands::Search { .. } | CategoryCommands::Tree => {}
        CategoryCommands::Lineage { id } => {
            let tree = hierarchy.tree().await;
            let id = CategoryId::new(id);
            println!("{} {}", "Ancestors:".bold(), join(&tree.ancestors(id)));
            println!("{} {}", "Descendants:".bold(), join(&tree.descendants(id)));
            return Ok(());
        }
        CategoryCommands::Create { name, parent } => {
            let mut category = Category::new(name);
            if let Some(parent) = parent {
                category = category.under(CategoryId::new(parent));
            }
            let created = hierarchy.create(category).await?;
            output::success(&format!("Created category {}", created.name));
        }
        CategoryCommands::Attach { parent, child } => {
            hierarchy
                .attach_child(CategoryId::new(parent), CategoryId::new(child))
                .await?;
            output::success(&format!("Attached {child} under {parent}"));
        }
        CategoryCommands::Reparent { node, parent } => {
            hierarchy
                .reparent(CategoryId::new(node), parent.map(CategoryId::new))
                .await?;
            output::success(&format!("Moved {node}"));
        }
        CategoryCommands::Detach { parent, child } => {
            hierarchy
                .detach_child(CategoryId::new(parent), CategoryId::new(child))
                .await?;
            output::success(&format!("Detached {child} from {parent}"));
        }
        CategoryCommands::Remove { id } => {
            hierarchy.remove(CategoryId::new(id)).await?;
            output::success(&format!("Removed {id}"));
        }
    }

    print!("{}", hierarchy.tree().await);
    Ok(())
}

fn join(ids: &[CategoryId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
