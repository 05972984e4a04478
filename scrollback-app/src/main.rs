//! scrollback-app — history engine demo against an in-memory conversation.
//!
//! Seeds a conversation, then scrolls, backfills, catches up and downloads
//! media through [`scrollback::History`], printing every handler event.
//!
//!   cargo run -p scrollback-app
//!
//! Set `RUST_LOG=scrollback=debug` to see every page query.

use std::time::Duration;

use scrollback::{
    CrawlOptions, Cursor, Event, Handlers, History, HistoryConfig, MediaInfo, MemoryBackend,
    MessageContent, MessageRecord, TypedMessage,
};

// ── Demo parameters ───────────────────────────────────────────────────────────
const CONVERSATION:  &str  = "team@chat.example";
const MESSAGE_COUNT: usize = 42;
const PHOTO_URL:     &str  = "https://media.example/photo-17";
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Enable logging: RUST_LOG=scrollback=info,scrollback_app=info cargo run
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: single-threaded at this point, no other threads reading env
        unsafe { std::env::set_var("RUST_LOG", "scrollback=info,scrollback_app=info"); }
    }
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("\n✗ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let backend = seed();
    println!("🗂  Seeded {} messages in {CONVERSATION}", backend.message_count(CONVERSATION));

    let history = History::new(
        backend,
        HistoryConfig {
            chunk_size:            10,
            pause_between_queries: Duration::from_millis(200),
            ..Default::default()
        },
        Handlers::new().with(print_event),
    );

    // ── Scroll: the five newest messages ──────────────────────────────
    println!("\n📜 Newest 5 messages");
    history.load_messages(CONVERSATION, 5, Cursor::latest(), None).await?;

    // ── Full backfill, counted by a dedicated handler ─────────────────
    println!("\n⏪ Full history");
    let counted = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = counted.clone();
    let quiet = Handlers::new().with(move |e: &Event| {
        if let Event::Raw(_) = e {
            counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    });
    let backfill = history.load_full_history(CONVERSATION, Some(quiet), CrawlOptions::default()).await?;
    println!("   first page in, crawling the rest in the background …");
    backfill.join().await;
    println!("   {} messages backfilled", counted.load(std::sync::atomic::Ordering::Relaxed));

    // ── Catch up after message 35 (sent by the other side) ───────────
    println!("\n⏩ Catching up after m35");
    history.load_history_after(CONVERSATION, "m35", None, CrawlOptions::default().chunk_size(3)).await;

    // ── Media: m16 is followed by the photo ───────────────────────────
    println!("\n🖼  Downloading media next to m16");
    let bytes = history.download_media(CONVERSATION, "m16").await?;
    println!("   {} bytes", bytes.len());

    Ok(())
}

fn seed() -> MemoryBackend {
    let backend = MemoryBackend::new();
    let now = chrono::Utc::now().timestamp() as u64;
    for i in 1..=MESSAGE_COUNT {
        let content = if i == 17 {
            MessageContent::Image(MediaInfo {
                url:         PHOTO_URL.to_string(),
                media_key:   vec![0x5a; 32],
                mime_type:   "image/jpeg".into(),
                file_length: 4,
                caption:     Some("whiteboard".into()),
            })
        } else {
            MessageContent::Text(format!("message number {i}"))
        };
        let record = MessageRecord::new(format!("m{i}"), i % 3 == 0, content)
            .at(now - (MESSAGE_COUNT - i) as u64 * 60);
        backend.push(CONVERSATION, record);
    }
    backend.put_media(PHOTO_URL, vec![0xff, 0xd8, 0xff, 0xe0]);
    backend
}

fn print_event(event: &Event) {
    match event {
        Event::Message(TypedMessage::Text(m)) => {
            let who = if m.is_own_message { "me" } else { "them" };
            println!("   💬 [{}] {who:>4}: {}", timestamp(m.timestamp), m.text);
        }
        Event::Message(TypedMessage::ConversionError(e)) => println!("   ⚠️  {e}"),
        Event::Message(other) => match other.media() {
            Some(media) => println!(
                "   📎 [{}] {} ({}, {} bytes)",
                timestamp(media.timestamp), media.file_name(), media.info.mime_type, media.info.file_length,
            ),
            None => println!("   ❔ {:?}", other.id()),
        },
        Event::Raw(_) => {}
        Event::Error(e) => println!("   ✗ {e}"),
    }
}

fn timestamp(ts: u64) -> String {
    chrono::DateTime::from_timestamp(ts as i64, 0)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".into())
}
