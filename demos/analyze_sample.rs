//! Analyze a small checkout recording and print every output form

use session_lens::{render_context, render_transcript, SessionAnalyzer};

fn main() {
    let json = r#"[
        {"type": 4, "timestamp": 1700000000000, "data": {"href": "https://shop.test/checkout", "width": 390, "height": 844}},
        {"type": 2, "timestamp": 1700000000020, "data": {"node": {"type": 0, "id": 1, "childNodes": [
            {"type": 2, "id": 2, "tagName": "title", "attributes": {}, "childNodes": [{"type": 3, "id": 3, "textContent": "Checkout"}]},
            {"type": 2, "id": 4, "tagName": "input", "attributes": {"name": "coupon", "placeholder": "Coupon code"}, "childNodes": []},
            {"type": 2, "id": 5, "tagName": "button", "attributes": {}, "childNodes": [{"type": 3, "id": 6, "textContent": "Apply"}]},
            {"type": 2, "id": 7, "tagName": "button", "attributes": {"aria-label": "Pay now"}, "childNodes": []}
        ]}}},
        {"type": 3, "timestamp": 1700000001500, "data": {"source": 2, "type": 7, "id": 4}},
        {"type": 3, "timestamp": 1700000002000, "data": {"source": 5, "id": 4, "text": "SAVE10"}},
        {"type": 3, "timestamp": 1700000003000, "data": {"source": 2, "type": 2, "id": 5}},
        {"type": 3, "timestamp": 1700000003300, "data": {"source": 2, "type": 2, "id": 5}},
        {"type": 3, "timestamp": 1700000003600, "data": {"source": 2, "type": 2, "id": 5}},
        {"type": 3, "timestamp": 1700000005000, "data": {"source": 3, "id": 1, "x": 0, "y": 600}},
        {"type": 3, "timestamp": 1700000006500, "data": {"source": 3, "id": 1, "x": 0, "y": 100}},
        {"type": 6, "timestamp": 1700000007000, "data": {"plugin": "rrweb/console@1", "payload": {"level": "error", "payload": ["Coupon service unavailable"]}}},
        {"type": 3, "timestamp": 1700000009000, "data": {"source": 2, "type": 2, "id": 7}},
        {"type": 3, "timestamp": 1700000009200, "data": {"source": 0, "adds": [], "removes": [], "texts": [], "attributes": [{"id": 7, "attributes": {"disabled": "true"}}]}},
        {"type": 5, "timestamp": 1700000010000, "data": {"tag": "purchase", "payload": {"name": "Order #1042"}}}
    ]"#;

    let session = match SessionAnalyzer::new().analyze_json(json) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    println!("{}", render_transcript(&session));
    println!();
    println!("{}", render_context(&session));
    println!();
    match session.to_json_pretty() {
        Ok(out) => println!("{out}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
