use criterion::{black_box, criterion_group, criterion_main, Criterion};

use er_core::memory::{MemoryDocument, MemoryWatcher};
use er_core::{Document, EngineConfig, FilterEngine};

const EMOTES: &[&str] = &["PatrickBoo", "RishiBypass", "Kappa", "LUL", "PogChamp"];

fn chat_document(entries: usize) -> MemoryDocument {
    let mut doc = MemoryDocument::new();
    let body = doc.body().expect("body");
    let list = doc.create_element("div", &[("id", "chat")]);
    doc.append_child(body, list).expect("append list");

    for i in 0..entries {
        let entry = doc.create_element("div", &[("class", "chat-entry")]);
        let text = doc.create_element("span", &[]);
        doc.append_child(entry, text).expect("append text");
        if i % 3 == 0 {
            let img = doc.create_element("img", &[("data-emote-name", EMOTES[i % EMOTES.len()])]);
            doc.append_child(text, img).expect("append emote");
        }
        doc.append_child(list, entry).expect("append entry");
    }
    doc
}

fn bench_start_stop(c: &mut Criterion) {
    let doc = chat_document(2_000);

    c.bench_function("start_stop_two_keys_2000_entries", |b| {
        b.iter(|| {
            let mut engine = FilterEngine::new(doc.clone(), MemoryWatcher::new(), EngineConfig::default());
            let hidden = engine.start(["PatrickBoo", "Kappa"]);
            let restored = engine.stop_all();
            black_box((hidden, restored))
        })
    });

    c.bench_function("bulk_settle_2000_entries", |b| {
        b.iter(|| {
            let mut engine = FilterEngine::new(doc.clone(), MemoryWatcher::new(), EngineConfig::default());
            engine.start_bulk();
            black_box(engine.settle())
        })
    });
}

criterion_group!(benches, bench_start_stop);
criterion_main!(benches);
