use crate::infra::seeded_services;
use clap::Args;
use soup_directory::config::AppConfig;
use soup_directory::directory::{CityCount, RestaurantListing, SearchFilters, SoupTypeCounts};
use soup_directory::error::AppError;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct SearchArgs {
    /// CSV export to seed the directory from (falls back to APP_SEED_CSV)
    #[arg(long, value_name = "PATH")]
    pub(crate) seed_csv: Option<PathBuf>,
    /// Restrict results to one launch city
    #[arg(long)]
    pub(crate) city: Option<String>,
    /// Restrict results to one state (code or full name)
    #[arg(long)]
    pub(crate) state: Option<String>,
    /// Soup type to look for; repeat for any-of matching
    #[arg(long = "soup-type")]
    pub(crate) soup_types: Vec<String>,
    /// Minimum rating (inclusive)
    #[arg(long)]
    pub(crate) min_rating: Option<f32>,
    /// Only featured restaurants
    #[arg(long)]
    pub(crate) featured: bool,
    /// Rows per page (clamped to the configured maximum)
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub(crate) page: usize,
    /// Sort field: rating, name, review_count or created_at
    #[arg(long)]
    pub(crate) sort_by: Option<String>,
    /// Sort direction: asc or desc
    #[arg(long)]
    pub(crate) sort_order: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CountsArgs {
    /// CSV export to seed the directory from (falls back to APP_SEED_CSV)
    #[arg(long, value_name = "PATH")]
    pub(crate) seed_csv: Option<PathBuf>,
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let seed_csv = args.seed_csv.clone().or(config.directory.seed_csv.clone());
    let services = seeded_services(&config.directory, seed_csv.as_deref())?;

    let limit = services.query.page_size(args.limit);
    let filters = SearchFilters {
        city: args.city,
        state: args.state,
        soup_types: args.soup_types,
        min_rating: args.min_rating,
        featured: args.featured.then_some(true),
        limit: Some(limit),
        offset: args.page.max(1).saturating_sub(1).saturating_mul(limit),
        sort_by: args.sort_by,
        sort_order: args.sort_order,
        ..SearchFilters::default()
    };

    let result = services.query.search(&filters)?;
    println!(
        "{} restaurant(s) match; showing {}",
        result.total_count,
        result.rows.len()
    );
    for listing in &result.rows {
        println!("{}", render_listing(listing));
    }
    Ok(())
}

pub(crate) fn run_counts(args: CountsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let seed_csv = args.seed_csv.or(config.directory.seed_csv.clone());
    let services = seeded_services(&config.directory, seed_csv.as_deref())?;

    let cities = services.counts.city_counts()?;
    let soups = services.counts.soup_type_counts()?;
    print!("{}", render_counts(&cities, &soups));
    Ok(())
}

fn render_listing(listing: &RestaurantListing) -> String {
    let restaurant = &listing.restaurant;
    let location = match (&restaurant.city, &restaurant.state) {
        (Some(city), Some(state)) => format!("{city}, {state}"),
        _ => "unknown location".to_string(),
    };
    let rating = restaurant
        .rating
        .map(|rating| format!("{rating:.1}"))
        .unwrap_or_else(|| "unrated".to_string());
    let mut soups: Vec<&str> = listing
        .soups
        .iter()
        .map(|soup| soup.soup_type.as_str())
        .collect();
    soups.sort_unstable();

    format!(
        "- {} [{}] ({location}) rating {rating}: {}",
        restaurant.name,
        restaurant.slug,
        if soups.is_empty() {
            "no soups listed".to_string()
        } else {
            soups.join(", ")
        }
    )
}

fn render_counts(cities: &[CityCount], soups: &SoupTypeCounts) -> String {
    let mut output = String::from("Cities\n");
    for city in cities {
        output.push_str(&format!("  {}, {}: {}\n", city.city, city.state, city.count));
    }
    output.push_str("Soup types\n");
    for (key, count) in &soups.counts {
        let name = soups.names.get(key).map(String::as_str).unwrap_or(key);
        output.push_str(&format!("  {name}: {count}\n"));
    }
    output
}
