use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, InquireError, Select, Text};
use meteo_core::{
    CityDetailFlow, Config, FavoriteCity, FileStore, Screen, SearchSession, detail_flow_from_config,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "City weather lookup with favorites")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the result language and suggestion count.
    Configure,

    /// List cities matching a query.
    Search {
        query: String,

        /// Maximum number of candidates; defaults to the configured limit.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show the forecast for a city.
    Show {
        /// City name, e.g. "Paris".
        city: String,
    },

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Search, pick a city, view it and toggle it as a favorite.
    Browse,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    List,
    /// Resolve a city and add it.
    Add { city: String },
    /// Remove every favorite with this name.
    Remove { name: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config)?,
            Command::Search { query, limit } => {
                let flow = detail_flow_from_config(&config)?;
                let limit = limit.unwrap_or(config.suggestion_limit);
                let results = flow.geocoder().search_cities(query.trim(), limit).await;

                if results.is_empty() {
                    println!("Aucun résultat");
                }
                for result in &results {
                    println!("{}", render::suggestion_line(result));
                }
            }
            Command::Show { city } => {
                let flow = detail_flow_from_config(&config)?;
                show(&flow, &city).await;
            }
            Command::Favorites { action } => {
                let flow = detail_flow_from_config(&config)?;
                favorites(&flow, action.unwrap_or(FavoritesAction::List)).await;
            }
            Command::Browse => {
                let flow = detail_flow_from_config(&config)?;
                match browse(&config, &flow).await {
                    Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {}
                    other => other.context("Interactive prompt failed")?,
                }
            }
        }

        Ok(())
    }
}

async fn show(flow: &CityDetailFlow<FileStore>, city: &str) {
    match flow.load(city).await {
        Some(detail) => print!("{}", render::detail(&detail)),
        None => println!("Ville introuvable : {city}"),
    }
}

async fn favorites(flow: &CityDetailFlow<FileStore>, action: FavoritesAction) {
    let store = flow.favorites();

    match action {
        FavoritesAction::List => {
            let favs = store.list().await;
            if favs.is_empty() {
                println!("Aucune ville favorite.");
            }
            for fav in &favs {
                println!("{}", render::favorite_line(fav));
            }
        }
        FavoritesAction::Add { city } => match flow.geocoder().resolve_city(&city).await {
            Some(found) => {
                let fav = FavoriteCity::from(&found);
                let line = render::favorite_line(&fav);
                if store.add(fav).await {
                    println!("Ajoutée : {line}");
                } else {
                    println!("Non ajoutée (déjà favorite ou stockage indisponible) : {line}");
                }
            }
            None => println!("Ville introuvable : {city}"),
        },
        FavoritesAction::Remove { name } => {
            match store.remove(&name).await {
                0 => println!("Aucune ville favorite nommée {name}"),
                n => println!("Retirée : {name} ({n})"),
            }
        }
    }
}

/// Home screen, then one detail screen per chosen city.
async fn browse(config: &Config, flow: &CityDetailFlow<FileStore>) -> Result<(), InquireError> {
    let mut screen = Screen::Home;

    loop {
        let city = match pick_city(config, flow, screen).await? {
            Some(city) => city,
            None => continue,
        };

        let Some(mut detail) = flow.load(&city).await else {
            println!("Ville introuvable : {city}");
            continue;
        };
        print!("{}", render::detail(&detail));
        screen = Screen::Detail;

        let prompt = if detail.is_favorite { "Retirer des favoris ?" } else { "Ajouter aux favoris ?" };
        if Confirm::new(prompt).with_default(false).prompt()? {
            flow.toggle_favorite(&mut detail).await;
        }
    }
}

/// Offer favorites on the home screen, otherwise run a debounced search.
async fn pick_city(
    config: &Config,
    flow: &CityDetailFlow<FileStore>,
    screen: Screen,
) -> Result<Option<String>, InquireError> {
    if screen == Screen::Home {
        let favs = flow.favorites().list().await;
        if !favs.is_empty() {
            let mut options: Vec<String> = favs.iter().map(render::favorite_line).collect();
            options.push("Rechercher une ville…".to_string());

            let choice = Select::new("Villes favorites", options).raw_prompt()?;
            if let Some(fav) = favs.get(choice.index) {
                return Ok(Some(fav.name.clone()));
            }
        }
    }

    // the prompt hands over a finished line, there are no keystrokes to absorb
    let search = config.search_config(screen).without_debounce();
    let mut session = SearchSession::new(flow.geocoder(), search);
    let text = Text::new("Entrez une ville...").prompt()?;
    session.input(text.as_str());
    let state = session.settle().await.clone();

    if !state.dropdown_visible {
        // too short for suggestions, go straight to the raw text
        return Ok(session.submit().map(|route| route.city));
    }

    let mut options: Vec<String> = state.suggestions.iter().map(render::suggestion_line).collect();
    if options.is_empty() {
        println!("Aucun résultat");
    }
    let raw_index = options.len();
    options.push(format!("Rechercher « {} »", text.trim()));

    let choice = Select::new("Suggestions", options).raw_prompt()?;
    let route = if choice.index == raw_index {
        session.submit()
    } else {
        session.select(choice.index)
    };

    Ok(route.map(|route| route.city))
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let language = Text::new("Langue des résultats :")
        .with_default(&config.language)
        .prompt()?;
    config.language = language;
    config.suggestion_limit = CustomType::<usize>::new("Nombre de suggestions :")
        .with_default(config.suggestion_limit)
        .prompt()?;

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}
