mod client;
mod parse;
mod services;

pub use client::{BrewClient, BrewTimeouts};
pub use parse::{
    formula_from_cellar_path, parse_family_formula, parse_installed_formulae, parse_search_output,
    parse_services_list,
};
pub use services::BrewServices;
