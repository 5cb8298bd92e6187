//! `cellar`: operator client for the cellar catalog backend.
//!
//! # Usage
//!
//! ```text
//! cellar handbooks
//! cellar show 42
//! cellar image 65f0c --variant full --out label.webp
//! cellar create --set title=Gavi --set subcategory_id=4 --set subregion_id=12 \
//!               --varietal 3:100 --food 8 --file gavi.jpg
//! cellar edit 42 --set price=31 --varietal 5:40 --drop-food 8 --new-drink
//! ```
//!
//! The bearer token is read from `CELLAR_TOKEN` before every request.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use cellar_client::{
  ApiClient, AssetResolver, ClientConfig, EnvCredentials, HandbookCache, HandleRegistry,
  Reconciler,
};
use cellar_codec::token;
use cellar_core::{
  draft::DrinkAction,
  handbook::HandbookKind,
  ids::{EntityId, ResourceId},
  item::FileAttachment,
  locale::Locale,
  relation::VarietalSet,
  transport::{Transport, Variant},
};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use strum::IntoEnumIterator;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cellar", version, about = "Operator client for the cellar catalog")]
struct Cli {
  /// Path to a TOML config file (base_url, locale, token, timeout_secs).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Backend base URL.
  #[arg(long, env = "CELLAR_BASE_URL")]
  url: Option<String>,

  /// UI locale (en, ru, fr, es, it, de, zh).
  #[arg(long, env = "CELLAR_LOCALE")]
  locale: Option<Locale>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the five reference lists in display order.
  Handbooks,
  /// Load an item into a draft and print its form fields.
  Show { id: String },
  /// Fetch an item image through the authenticated asset endpoint.
  Image {
    id:      String,
    /// `full` for the full-resolution image, anything else for the thumbnail.
    #[arg(long, default_value = "thumbnail")]
    variant: String,
    #[arg(long, value_name = "FILE")]
    out:     PathBuf,
  },
  /// Create an item.
  Create(EditArgs),
  /// Edit an existing item.
  Edit {
    id:    String,
    #[command(flatten)]
    edits: EditArgs,
  },
}

#[derive(Args, Debug)]
struct EditArgs {
  /// Set a form field, e.g. `title_ru=Бароло` or `vol=0.75`.
  #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
  set:            Vec<(String, String)>,
  /// Select a varietal with its percentage.
  #[arg(long = "varietal", value_name = "ID:PCT")]
  varietals:      Vec<String>,
  #[arg(long = "drop-varietal", value_name = "ID")]
  drop_varietals: Vec<EntityId>,
  /// Select a food pairing.
  #[arg(long = "food", value_name = "ID")]
  foods:          Vec<EntityId>,
  #[arg(long = "drop-food", value_name = "ID")]
  drop_foods:     Vec<EntityId>,
  /// Replace the item image with this file.
  #[arg(long, value_name = "FILE")]
  file:           Option<PathBuf>,
  /// Save the localized content as a new drink record instead of updating
  /// the current one.
  #[arg(long)]
  new_drink:      bool,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
  raw
    .split_once('=')
    .map(|(k, v)| (k.trim().to_string(), v.to_string()))
    .ok_or_else(|| format!("expected FIELD=VALUE, got {raw:?}"))
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  // Config file and CELLAR_* variables first; explicit flags win.
  let mut config =
    ClientConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
  if let Some(url) = cli.url {
    config.base_url = url;
  }
  if let Some(locale) = cli.locale {
    config.locale = locale;
  }

  let credentials = EnvCredentials::default().with_fallback(config.token.clone());
  let client =
    Arc::new(ApiClient::new(&config, credentials).context("failed to build HTTP client")?);
  let cache = HandbookCache::new(Arc::clone(&client));

  match cli.command {
    Command::Handbooks => print_handbooks(&cache, config.locale).await,
    Command::Show { id } => show(client, &cache, config.locale, &id).await,
    Command::Image { id, variant, out } => fetch_image(client, &id, &variant, out).await,
    Command::Create(edits) => {
      let mut form = Reconciler::new_create(client, cache.load(config.locale).await);
      apply_edits(&mut form, edits).await?;
      submit(form).await
    }
    Command::Edit { id, edits } => {
      let mut form = open_edit(client, &cache, config.locale, &id).await?;
      apply_edits(&mut form, edits).await?;
      submit(form).await
    }
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn print_handbooks<T: Transport>(cache: &HandbookCache<T>, locale: Locale) -> Result<()> {
  let set = cache.load(locale).await;
  for kind in HandbookKind::iter() {
    println!("{kind}:");
    for entry in set.list(kind) {
      println!("  {:>6}  {}", entry.id, entry.display_name(cache.order()));
    }
  }
  if !set.is_complete() {
    eprintln!("warning: some lists could not be loaded: {:?}", set.degraded);
  }
  Ok(())
}

async fn open_edit<T: Transport>(
  client: Arc<T>,
  cache: &HandbookCache<T>,
  locale: Locale,
  id: &str,
) -> Result<Reconciler<T>> {
  let mut form = Reconciler::new_edit(client, id);
  if let Some(message) = form.error() {
    bail!("cannot edit item {id:?}: {message}");
  }
  form
    .hydrate(cache.load(locale).await)
    .await
    .with_context(|| format!("failed to load item {id}"))?;
  Ok(form)
}

async fn show<T: Transport>(
  client: Arc<T>,
  cache: &HandbookCache<T>,
  locale: Locale,
  id: &str,
) -> Result<()> {
  let form = open_edit(client, cache, locale, id).await?;
  let Some(draft) = form.draft() else {
    bail!("item {id} did not produce a draft");
  };
  let out = json!({
    "fields": draft.flat_record(),
    "varietals": form.varietal_tokens(),
    "foods": token::encode(&draft.foods),
    "image_path": draft.image_path,
  });
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}

async fn fetch_image<C>(
  client: Arc<ApiClient<C>>,
  id: &str,
  variant: &str,
  out: PathBuf,
) -> Result<()>
where
  C: cellar_core::transport::CredentialSupplier,
{
  let mut resolver = AssetResolver::new(client, HandleRegistry::new());
  let published = resolver
    .resolve(ResourceId::new(id), Variant::from_selector(variant))
    .await
    .is_some();
  if !published {
    match resolver.last_error() {
      Some(err) => bail!("image {id} unavailable: {err}"),
      None => bail!("no image id given"),
    }
  }
  if let Some(handle) = resolver.handle() {
    tokio::fs::write(&out, handle.bytes())
      .await
      .with_context(|| format!("writing {}", out.display()))?;
    println!("{} -> {}", handle.locator(), out.display());
  }
  resolver.teardown();
  Ok(())
}

async fn apply_edits<T: Transport>(form: &mut Reconciler<T>, edits: EditArgs) -> Result<()> {
  for (field, value) in &edits.set {
    form
      .set_field(field, value)
      .with_context(|| format!("--set {field}={value}"))?;
  }

  let (varietals, rejects): (VarietalSet, _) = token::decode_with_rejects(&edits.varietals);
  if !rejects.is_empty() {
    bail!("malformed --varietal values (expected ID:PCT): {rejects:?}");
  }
  for edge in varietals.iter() {
    form.toggle_varietal(edge.target, true)?;
    form.set_varietal_percentage(edge.target, &edge.attribute.to_string())?;
  }
  for id in edits.drop_varietals {
    form.toggle_varietal(id, false)?;
  }
  for id in edits.foods {
    form.toggle_food(id, true)?;
  }
  for id in edits.drop_foods {
    form.toggle_food(id, false)?;
  }

  if let Some(path) = edits.file {
    let bytes = tokio::fs::read(&path)
      .await
      .with_context(|| format!("reading {}", path.display()))?;
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());
    form.attach(FileAttachment::new(name, bytes))?;
  }
  if edits.new_drink {
    form.set_drink_action(DrinkAction::Create)?;
  }
  Ok(())
}

async fn submit<T: Transport>(mut form: Reconciler<T>) -> Result<()> {
  form.submit().await.context("submission failed")?;
  println!("submitted");
  Ok(())
}
