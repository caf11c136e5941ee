use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kissbot_maple_engine::{EngineConfig, HealthStatus, MapleEngine, RankingQuery, RankingSearch};

#[derive(Parser)]
#[command(name = "maple-engine-cli")]
#[command(about = "KissBot Maple Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (YAML); defaults + environment when absent
    #[arg(short, long)]
    config: Option<String>,

    /// Print raw JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a character
    Character {
        name: String,

        /// Snapshot date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Look up a guild
    Guild {
        name: String,

        /// World the guild lives in
        #[arg(short, long)]
        world: String,

        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show one page of the overall ranking
    Ranking {
        #[arg(short, long)]
        world: Option<String>,

        /// Upstream class filter, e.g. "전사-히어로"
        #[arg(short, long)]
        class: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Find a character's position in the overall ranking
    Find {
        name: String,

        #[arg(short, long)]
        world: Option<String>,

        /// Class or sub-class name
        #[arg(short, long)]
        class: Option<String>,

        /// Pages to scan (1-20)
        #[arg(short, long, default_value = "5")]
        max_pages: u32,

        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Check the upstream API
    Health,

    /// Show cache and limiter statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kissbot_maple_engine=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).await?,
        None => EngineConfig::from_env(),
    };
    let engine = MapleEngine::new(config)?;

    match cli.command {
        Commands::Character { name, date } => {
            println!("🔍 Looking up: {}", name);
            let profile = engine.lookup_character(&name, date).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                let basic = &profile.basic;
                println!("\n✅ {} ({})", basic.character_name, basic.world_name);
                println!("   Class: {}", basic.character_class);
                println!("   Level: {} ({}%)", basic.character_level, basic.character_exp_rate);
                println!("   Guild: {}", basic.character_guild_name.as_deref().unwrap_or("N/A"));
                println!("   Active: {}", basic.is_recently_active());
                if let Some(power) = profile.stat.stat("전투력") {
                    println!("   Combat power: {}", power);
                }
            }
        }

        Commands::Guild { name, world, date } => {
            let profile = engine.lookup_guild(&name, &world, date).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                let basic = &profile.basic;
                println!("✅ {} ({})", basic.guild_name, basic.world_name);
                println!("   Level: {}", basic.guild_level);
                println!("   Master: {}", basic.guild_master_name);
                println!("   Members: {}", basic.guild_member_count);
                println!("   Fame: {}", basic.guild_fame);
            }
        }

        Commands::Ranking { world, class, page, date } => {
            let query = RankingQuery { date, world, class, page };
            let ranking = engine.overall_ranking(&query).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&ranking)?);
            } else {
                println!("📋 Overall ranking, page {}:", page);
                for entry in &ranking.entries {
                    println!(
                        "   {:>5}. {} Lv.{} {} ({})",
                        entry.rank, entry.name, entry.level, entry.class, entry.world
                    );
                }
            }
        }

        Commands::Find { name, world, class, max_pages, date } => {
            let search = RankingSearch { name, world, class, max_pages, date };
            println!("🔍 Searching {} page(s) for: {}", search.max_pages, search.name);

            let result = engine.find_position(&search).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match &result.entry {
                    Some(entry) => {
                        println!("\n🏆 Rank {}: {} Lv.{}", entry.rank, entry.name, entry.level);
                        println!("   {} / {}", entry.class, entry.sub_class);
                        println!("   World: {}", entry.world);
                    }
                    None => println!("\n❌ Not found"),
                }
                println!("   Pages searched: {}", result.searched_pages);
            }
        }

        Commands::Health => {
            let report = engine.health_check().await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let icon = match report.status {
                    HealthStatus::Ok => "✅",
                    HealthStatus::Degraded => "⚠️",
                    HealthStatus::Unreachable => "❌",
                };
                println!("{} Upstream: {:?}", icon, report.status);
                println!("   Latency: {:.2}ms", report.latency_ms);
                println!("   Checked: {}", report.checked_at.format("%Y-%m-%d %H:%M:%S"));
                if let Some(err) = &report.error {
                    println!("   Error: {}", err);
                }
            }
        }

        Commands::Stats => {
            let stats = engine.cache_stats();
            let limiter = engine.limiter_stats();

            println!("📊 Cache Statistics:");
            println!("   Entries: {}", stats.entries);
            println!(
                "   Hits: {} / Misses: {} ({:.1}%)",
                stats.hits,
                stats.misses,
                stats.hit_rate() * 100.0
            );
            println!("   Evictions: {} / Expirations: {}", stats.evictions, stats.expirations);

            if let Some(oldest) = stats.oldest_entry {
                println!("   Oldest entry: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
            }

            if let Some(newest) = stats.newest_entry {
                println!("   Newest entry: {}", newest.format("%Y-%m-%d %H:%M:%S"));
            }

            println!("\n🎫 Limiter:");
            println!("   Max concurrent: {}", limiter.max_concurrent);
            println!("   Granted: {} / Timeouts: {}", limiter.granted, limiter.timeouts);
        }
    }

    Ok(())
}
