//! JS snippets evaluated in the page. Every script is an IIFE returning a
//! JSON-serializable value so results can be decoded with serde.

fn escape_js(input: &str) -> String {
    input.replace('\\', "\\\\").replace('"', "\\\"")
}

fn selector_array(selectors: &[String]) -> String {
    selectors
        .iter()
        .map(|s| format!("\"{}\"", escape_js(s)))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn count(selector: &str) -> String {
    format!(
        "(() => document.querySelectorAll(\"{}\").length)()",
        escape_js(selector)
    )
}

pub fn scroll_by(delta_y: f64) -> String {
    format!("(() => {{ window.scrollBy(0, {delta_y}); return true; }})()")
}

/// Clicks the first present, enabled element among the candidates.
/// Scripted clicks are deliberate: they work on elements a native click
/// would reject as obscured, which the filter panel is prone to.
pub fn click_first(selectors: &[String]) -> String {
    format!(
        r#"
(() => {{
    const selectors = [{selectors}];
    for (const selector of selectors) {{
        const el = document.querySelector(selector);
        if (el && !el.disabled) {{
            el.click();
            return true;
        }}
    }}
    return false;
}})()
"#,
        selectors = selector_array(selectors)
    )
}

pub fn click_link_by_text(scope: &str, text: &str) -> String {
    format!(
        r#"
(() => {{
    const links = document.querySelectorAll("{scope} a");
    for (const link of links) {{
        if ((link.textContent || "").trim() === "{text}") {{
            link.click();
            return true;
        }}
    }}
    return false;
}})()
"#,
        scope = escape_js(scope),
        text = escape_js(text)
    )
}

/// Clicks the first interactive element under `scope` whose text or
/// aria-label contains any needle, case-insensitively.
pub fn click_containing(scope: &str, needles: &[String]) -> String {
    let scope = escape_js(scope);
    let lowered = needles
        .iter()
        .map(|n| format!("\"{}\"", escape_js(&n.to_lowercase())))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        r#"
(() => {{
    const needles = [{lowered}];
    const candidates = document.querySelectorAll("{scope} a, {scope} button, {scope} label");
    for (const el of candidates) {{
        const label = ((el.getAttribute("aria-label") || el.textContent) || "").trim().toLowerCase();
        if (label && needles.some(needle => label.includes(needle))) {{
            el.click();
            return true;
        }}
    }}
    return false;
}})()
"#
    )
}

pub fn pager_labels(scope: &str) -> String {
    format!(
        r#"
(() => Array.from(document.querySelectorAll("{scope} a"))
    .map(link => (link.textContent || "").trim())
    .filter(Boolean))()
"#,
        scope = escape_js(scope)
    )
}

pub fn radio_checked(selector: &str) -> String {
    format!(
        r#"
(() => {{
    const el = document.querySelector("{selector}");
    return !!(el && el.checked);
}})()
"#,
        selector = escape_js(selector)
    )
}

/// Forces the radio into the selected state and synthesizes the change
/// notification the page listens for.
pub fn force_check_radio(selector: &str) -> String {
    format!(
        r#"
(() => {{
    const el = document.querySelector("{selector}");
    if (!el) {{
        return false;
    }}
    el.checked = true;
    el.dispatchEvent(new Event("change", {{ bubbles: true }}));
    return true;
}})()
"#,
        selector = escape_js(selector)
    )
}

pub fn product_cards(card_selectors: &[String]) -> String {
    format!(
        r#"
(() => {{
    const selectors = [{selectors}];
    let cards = [];
    for (const selector of selectors) {{
        cards = Array.from(document.querySelectorAll(selector));
        if (cards.length > 0) {{
            break;
        }}
    }}
    const text = (root, selector) => {{
        const el = root.querySelector(selector);
        return el ? (el.textContent || "").trim() : null;
    }};
    return cards.map(card => {{
        try {{
            const anchor = card.querySelector("a");
            return {{
                name: text(card, "div.prd_info .tx_name"),
                brand: text(card, "div.prd_info .tx_brand"),
                link: anchor ? anchor.href : null
            }};
        }} catch (_) {{
            return null;
        }}
    }}).filter(Boolean);
}})()
"#,
        selectors = selector_array(card_selectors)
    )
}

/// A malformed entry yields no payload element instead of failing the page.
pub fn review_entries(list_selector: &str) -> String {
    format!(
        r#"
(() => {{
    const items = document.querySelectorAll("{list} > li");
    const text = (root, selector) => {{
        const el = root.querySelector(selector);
        return el ? (el.textContent || "").trim() : null;
    }};
    const out = [];
    for (const item of items) {{
        try {{
            const tagNodes = item.querySelectorAll("div.info > div > p.tag > span");
            const tags = Array.from(tagNodes)
                .map(el => (el.textContent || "").trim())
                .filter(Boolean);
            const point = item.querySelector("div.review_cont > div.score_area > span.review_point > span");
            out.push({{
                customer_name: text(item, "div.info > div > p.info_user > a.id"),
                tags: tags,
                body: text(item, "div.review_cont > div.txt_inner"),
                date: text(item, "div.review_cont > div.score_area > span.date"),
                rating_text: point
                    ? ((point.getAttribute("title") || point.textContent || "").trim())
                    : null
            }});
        }} catch (_) {{
            continue;
        }}
    }}
    return out;
}})()
"#,
        list = escape_js(list_selector)
    )
}
