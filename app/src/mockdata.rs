//! FILENAME: app/src/mockdata.rs
//! Seeded generator for the demo's transactional dataset.
//!
//! Mirrors the marketing-attribution shape the table was designed around:
//! a catalog of sources/mediums/campaigns/contents/products, a pool of
//! tracked links with partially missing attribution, a pool of users, and
//! one item per request with an optional purchase.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use records::Record;

pub const DEFAULT_RECORD_COUNT: usize = 10_000;

const SOURCE_COUNT: usize = 20;
const MEDIUM_COUNT: usize = 10;
const CAMPAIGN_COUNT: usize = 10;
const CONTENT_COUNT: usize = 10;
const PRODUCT_COUNT: usize = 50;
const LINK_COUNT: usize = 300;
const USER_COUNT: usize = 1_000;

// Generated dates are anchored to a fixed day so a given seed always
// produces the same dataset.
const ANCHOR: (i32, u32, u32) = (2024, 6, 30);
const SUBSCRIPTION_WINDOW_DAYS: i64 = 730;

const COMPANY_HEADS: &[&str] = &[
    "Global", "Prime", "Apex", "Northern", "Coastal", "United", "Quantum",
    "Silver", "Summit", "Cedar", "Harbor", "Pioneer", "Vertex", "Atlas",
    "Beacon", "Crystal", "Orbit", "Sterling", "Cascade", "Horizon",
];
const COMPANY_TAILS: &[&str] = &[
    "Media", "Systems", "Labs", "Partners", "Works", "Digital", "Analytics",
    "Networks", "Holdings", "Ventures",
];
const COMPANY_SUFFIXES: &[&str] = &["Group", "Inc", "LLC", "Co"];

const PRODUCT_ADJECTIVES: &[&str] = &[
    "Incredible", "Rustic", "Sleek", "Handmade", "Ergonomic", "Refined",
    "Practical", "Luxurious", "Modern", "Gorgeous",
];
const PRODUCT_MATERIALS: &[&str] = &[
    "Steel", "Wooden", "Granite", "Cotton", "Bronze", "Plastic", "Concrete",
    "Rubber", "Ceramic", "Leather",
];
const PRODUCT_NOUNS: &[&str] = &[
    "Chair", "Table", "Keyboard", "Lamp", "Bottle", "Backpack", "Notebook",
    "Mouse", "Headset", "Bicycle",
];

const FIRST_NAMES: &[&str] = &[
    "alex", "maria", "ivan", "elena", "chris", "dana", "felix", "nora",
    "oscar", "petra", "quinn", "rosa", "stefan", "tina", "viktor", "wendy",
];
const LAST_NAMES: &[&str] = &[
    "smith", "novak", "garcia", "kim", "weber", "rossi", "tanaka", "lopez",
    "muller", "ivanov", "jensen", "silva", "kowalski", "berg", "moreau", "fox",
];
const EMAIL_DOMAINS: &[&str] = &["example.com", "mail.test", "inbox.dev"];

// ============================================================================
// INTERMEDIATE POOLS
// ============================================================================

struct LinkRow {
    id: String,
    name: String,
    url: String,
    source_name: Option<String>,
    medium_name: Option<String>,
    campaign_name: Option<String>,
    content_name: Option<String>,
}

struct UserRow {
    id: String,
    username: String,
    email: String,
    subscription_date: NaiveDate,
}

fn company_name(rng: &mut StdRng) -> String {
    // choose() only returns None on an empty slice; the pools are const.
    let head = COMPANY_HEADS.choose(rng).copied().unwrap_or("Global");
    let tail = COMPANY_TAILS.choose(rng).copied().unwrap_or("Media");
    let suffix = COMPANY_SUFFIXES.choose(rng).copied().unwrap_or("Group");
    format!("{} {} {}", head, tail, suffix)
}

fn product_name(rng: &mut StdRng) -> String {
    let adjective = PRODUCT_ADJECTIVES.choose(rng).copied().unwrap_or("Modern");
    let material = PRODUCT_MATERIALS.choose(rng).copied().unwrap_or("Steel");
    let noun = PRODUCT_NOUNS.choose(rng).copied().unwrap_or("Chair");
    format!("{} {} {}", adjective, material, noun)
}

fn company_pool(rng: &mut StdRng, count: usize) -> Vec<String> {
    (0..count).map(|_| company_name(rng)).collect()
}

fn maybe_pick(rng: &mut StdRng, pool: &[String], probability: f64) -> Option<String> {
    if rng.random_bool(probability) {
        pool.choose(rng).cloned()
    } else {
        None
    }
}

fn anchor_date() -> NaiveDate {
    let (y, m, d) = ANCHOR;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// A uniformly random date in `from..=to` (inclusive on both ends).
fn date_between(rng: &mut StdRng, from: NaiveDate, to: NaiveDate) -> NaiveDate {
    let span = (to - from).num_days().max(0);
    from + Duration::days(rng.random_range(0..=span))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn link_pool(rng: &mut StdRng) -> Vec<LinkRow> {
    let sources = company_pool(rng, SOURCE_COUNT);
    let mediums = company_pool(rng, MEDIUM_COUNT);
    let campaigns = company_pool(rng, CAMPAIGN_COUNT);
    let contents = company_pool(rng, CONTENT_COUNT);

    (0..LINK_COUNT)
        .map(|i| {
            let name = company_name(rng);
            let slug: String = name
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            LinkRow {
                id: format!("lnk-{:03}", i),
                name,
                url: format!("https://{}.example.com/l/{:03}", slug, i),
                source_name: maybe_pick(rng, &sources, 0.8),
                medium_name: maybe_pick(rng, &mediums, 0.7),
                campaign_name: maybe_pick(rng, &campaigns, 0.6),
                content_name: maybe_pick(rng, &contents, 0.6),
            }
        })
        .collect()
}

fn user_pool(rng: &mut StdRng) -> Vec<UserRow> {
    let today = anchor_date();
    (0..USER_COUNT)
        .map(|i| {
            let first = FIRST_NAMES.choose(rng).copied().unwrap_or("alex");
            let last = LAST_NAMES.choose(rng).copied().unwrap_or("smith");
            let username = format!("{}_{}{}", first, last, i % 100);
            let domain = EMAIL_DOMAINS.choose(rng).copied().unwrap_or("example.com");
            let subscription_date = today
                - Duration::days(rng.random_range(0..SUBSCRIPTION_WINDOW_DAYS));
            UserRow {
                id: format!("usr-{:04}", i),
                email: format!("{}@{}", username, domain),
                username,
                subscription_date,
            }
        })
        .collect()
}

// ============================================================================
// GENERATOR
// ============================================================================

/// Generates `count` transactional records from a fixed seed.
///
/// Every item joins a random link (attribution fields may be absent) and a
/// random user. Half the items carry a purchase: those get an amount in
/// 100..=1000 and a purchase date. Request dates always fall after the
/// user's subscription date, purchase dates after the request date.
pub fn generate(count: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    let today = anchor_date();

    let products: Vec<String> = (0..PRODUCT_COUNT).map(|_| product_name(&mut rng)).collect();
    let links = link_pool(&mut rng);
    let users = user_pool(&mut rng);

    (0..count)
        .map(|i| {
            let is_purchase = rng.random_bool(0.5);
            let user = &users[rng.random_range(0..users.len())];
            let link = &links[rng.random_range(0..links.len())];
            let product = &products[rng.random_range(0..products.len())];

            let request_date = date_between(&mut rng, user.subscription_date, today);
            let purchase_date = if is_purchase {
                Some(format_date(date_between(&mut rng, request_date, today)))
            } else {
                None
            };
            let amount = if is_purchase {
                Some(f64::from(rng.random_range(100..=1000)))
            } else {
                None
            };

            Record::new(format!("itm-{:05}", i))
                .with("amount", amount)
                .with("request_date", format_date(request_date))
                .with("purchase_date", purchase_date)
                .with("product_name", product.as_str())
                .with("link_id", link.id.as_str())
                .with("link_name", link.name.as_str())
                .with("link_url", link.url.as_str())
                .with("link_source_name", link.source_name.clone())
                .with("link_medium_name", link.medium_name.clone())
                .with("link_campaign_name", link.campaign_name.clone())
                .with("link_content_name", link.content_name.clone())
                .with("user_id", user.id.as_str())
                .with("username", user.username.as_str())
                .with("user_email", user.email.as_str())
                .with("user_subscription_date", format_date(user.subscription_date))
        })
        .collect()
}
