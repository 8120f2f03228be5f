//! Full HTML pages for the audience and presenter views.
//!
//! Pages are rendered once per request with the current position baked in;
//! after that the client script keeps them current from `/api/events`.

use serde_json::json;

use super::markdown::escape_html;
use crate::live::nav::Resync;
use crate::parser::Deck;
use crate::theme::Theme;

pub const END_OF_DECK: &str = "<div class=\"end-of-deck\">End of presentation</div>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Audience,
    Presenter,
}

impl ViewMode {
    fn as_str(self) -> &'static str {
        match self {
            ViewMode::Audience => "audience",
            ViewMode::Presenter => "presenter",
        }
    }
}

pub struct AudienceView<'a> {
    pub deck: &'a Deck,
    pub theme: &'a Theme,
    pub resync: Resync,
    pub slide_html: &'a str,
}

pub struct PresenterView<'a> {
    pub deck: &'a Deck,
    pub theme: &'a Theme,
    pub resync: Resync,
    pub slide_html: &'a str,
    pub next_html: &'a str,
    pub notes_html: &'a str,
    pub token: &'a str,
}

pub fn audience_page(view: &AudienceView<'_>) -> String {
    let body = format!(
        r#"<main class="stage">
<div id="slide-content" class="slide-frame">{slide}</div>
<svg id="drawing-layer" class="drawing-layer" viewBox="0 0 160 90" preserveAspectRatio="none"></svg>
</main>
<footer class="status">
<span id="follow-indicator" class="follow-indicator" hidden>Browsing &middot; press F to follow</span>
<span id="slide-counter" class="slide-counter"></span>
</footer>"#,
        slide = view.slide_html,
    );
    document(
        view.deck,
        view.theme,
        ViewMode::Audience,
        view.resync,
        None,
        &body,
    )
}

pub fn presenter_page(view: &PresenterView<'_>) -> String {
    let body = format!(
        r#"<div class="presenter">
<section class="presenter-current">
<main class="stage">
<div id="slide-content" class="slide-frame">{slide}</div>
<svg id="drawing-layer" class="drawing-layer" viewBox="0 0 160 90" preserveAspectRatio="none"></svg>
</main>
</section>
<aside class="presenter-side">
<div class="presenter-bar">
<span id="slide-counter" class="slide-counter"></span>
<span id="presenter-timer" class="presenter-timer">00:00</span>
<span id="viewer-mode" class="viewer-mode">pen off</span>
</div>
<h3>Next</h3>
<div id="presenter-next" class="presenter-next">{next}</div>
<h3>Notes</h3>
<div id="presenter-notes-content" class="presenter-notes">{notes}</div>
<div class="presenter-help">&rarr;/space next &middot; &larr; prev &middot; D pen &middot; Z undo &middot; Y redo &middot; C clear</div>
</aside>
</div>"#,
        slide = view.slide_html,
        next = view.next_html,
        notes = view.notes_html,
    );
    document(
        view.deck,
        view.theme,
        ViewMode::Presenter,
        view.resync,
        Some(view.token),
        &body,
    )
}

pub fn access_denied_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Access Denied</title>
<style>{vars}
body {{ font-family: system-ui, sans-serif; background: var(--bg); color: var(--fg); display: grid; place-items: center; height: 100vh; margin: 0; }}</style>
</head>
<body>
<div>
<h1>Access Denied</h1>
<p>The presenter view needs the token printed when the server started.</p>
</div>
</body>
</html>
"#,
        vars = Theme::dark().to_css_vars(),
    )
}

fn document(
    deck: &Deck,
    theme: &Theme,
    mode: ViewMode,
    resync: Resync,
    token: Option<&str>,
    body: &str,
) -> String {
    let boot = json!({
        "mode": mode.as_str(),
        "token": token,
        "state": resync,
    });
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{vars}
{css}</style>
</head>
<body class="mode-{mode}" style="--aspect: {aspect}">
{body}
<script>window.SLIDECAST = {boot};</script>
<script>{js}</script>
</body>
</html>
"#,
        title = escape_html(&deck.config.title),
        vars = theme.to_css_vars(),
        css = BASE_CSS,
        mode = mode.as_str(),
        aspect = escape_html(&deck.config.aspect_ratio),
        boot = boot,
        js = CLIENT_JS,
    )
}

const BASE_CSS: &str = r#"
* { box-sizing: border-box; }
html, body { margin: 0; height: 100%; background: var(--bg); color: var(--fg); font-family: system-ui, sans-serif; }
.stage { position: relative; margin: auto; aspect-ratio: var(--aspect); max-width: 100vw; max-height: 100vh; height: 100vh; overflow: hidden; }
.slide-frame, .slide { position: absolute; inset: 0; }
.slide { padding: calc(80 * var(--unit)); font-size: var(--body-size); background-repeat: no-repeat; }
.slide h1 { font-size: var(--h1-size); color: var(--heading); margin: 0 0 0.4em; }
.slide h2 { font-size: var(--h2-size); color: var(--heading); margin: 0 0 0.4em; }
.slide h3 { font-size: var(--h3-size); color: var(--heading); }
.slide a { color: var(--accent); }
.slide code { font-size: var(--code-size); background: var(--code-bg); color: var(--code-fg); padding: 0 0.2em; border-radius: 4px; }
.slide pre.code-block { background: var(--code-bg); color: var(--code-fg); padding: 0.6em; border-radius: 8px; overflow: auto; }
.slide pre.code-block code { background: none; padding: 0; }
.slide img { max-width: 100%; max-height: 70vh; }
.layout-cover, .layout-center, .layout-section { display: flex; flex-direction: column; justify-content: center; text-align: center; }
.layout-image-left, .layout-image-right { display: grid; grid-template-columns: 1fr 1fr; gap: calc(40 * var(--unit)); }
.layout-image-right .slot-image { order: 2; }
.layout-grid { display: grid; grid-template-columns: repeat(var(--grid-cols, 2), 1fr); }
.click-reveal, .click-motion { opacity: 0; transition: opacity 0.3s ease, transform 0.3s ease; }
.click-motion { transform: translateY(0.5em); }
.click-reveal.revealed, .click-motion.revealed { opacity: 1; transform: none; }
.click-hide { transition: opacity 0.3s ease; }
.click-hide.click-hidden { opacity: 0; }
.click-swap { display: grid; }
.click-swap > * { grid-area: 1 / 1; }
.drawing-layer { position: absolute; inset: 0; width: 100%; height: 100%; pointer-events: none; }
.drawing-layer.drawing-active { pointer-events: auto; cursor: crosshair; }
.status { position: fixed; right: 1em; bottom: 0.6em; opacity: 0.6; font-size: 14px; display: flex; gap: 1em; }
.presenter { display: grid; grid-template-columns: 2fr 1fr; height: 100vh; gap: 1em; padding: 1em; }
.presenter .stage { height: auto; width: 100%; }
.presenter-side { overflow: auto; display: flex; flex-direction: column; gap: 0.4em; }
.presenter-bar { display: flex; gap: 1em; font-size: 20px; }
.presenter-next { position: relative; aspect-ratio: var(--aspect); font-size: 40%; border: 1px solid var(--accent); overflow: hidden; }
.presenter-next .slide { --unit: calc(min(100vw, 100vh) / 6000); }
.presenter-notes { font-size: 18px; line-height: 1.5; }
.presenter-help { margin-top: auto; font-size: 12px; opacity: 0.6; }
.end-of-deck { display: grid; place-items: center; height: 100%; opacity: 0.6; }
"#;

const CLIENT_JS: &str = r##"
(function () {
  "use strict";
  var boot = window.SLIDECAST;
  var token = boot.token;
  var presenter = boot.mode === "presenter";
  var state = boot.state;
  var following = true;
  var drawings = {};
  var penOn = false;

  function visible(label, clicks) {
    var parts = String(label).split("-");
    if (parts.length === 2) {
      return clicks >= Number(parts[0]) && clicks < Number(parts[1]);
    }
    return clicks >= Number(label);
  }

  function applyClicks() {
    document.querySelectorAll("#slide-content [data-click]").forEach(function (el) {
      var on = visible(el.getAttribute("data-click"), state.clicks);
      if (el.classList.contains("click-hide")) {
        el.classList.toggle("click-hidden", on);
      } else {
        el.classList.toggle("revealed", on);
      }
    });
    var counter = document.getElementById("slide-counter");
    if (counter) {
      counter.textContent = (state.slide_index + 1) + " / " + state.total_slides;
    }
    var hash = "#" + (state.slide_index + 1) + (state.clicks > 0 ? "." + state.clicks : "");
    if (location.hash !== hash) {
      history.replaceState(null, "", hash);
    }
    renderDrawing();
  }

  function setContent(target, html) {
    var el = document.getElementById(target);
    if (el) {
      el.innerHTML = html;
    }
  }

  function applyResync(data) {
    state = {
      slide_index: data.slide_index,
      clicks: data.clicks,
      max_clicks: data.max_clicks,
      total_slides: data.total_slides
    };
    if (typeof data.html === "string") {
      setContent("slide-content", data.html);
    }
    applyClicks();
  }

  function setFollowing(value) {
    following = value;
    var indicator = document.getElementById("follow-indicator");
    if (indicator) {
      indicator.hidden = value;
    }
  }

  // Drawing overlay: elements are opaque; only pen strokes with points are painted.
  function slideDrawing(index) {
    if (!drawings[index]) {
      drawings[index] = { elements: {}, order: [] };
    }
    return drawings[index];
  }

  function applyDrawing(data) {
    var d = slideDrawing(data.slide_index);
    if (data.snapshot) {
      d.elements = {};
      d.order = [];
    }
    data.changes.forEach(function (c) {
      if (c.type === "create" || c.type === "update") {
        d.elements[c.element.id] = c.element;
        if (d.order.indexOf(c.element.id) < 0) {
          d.order.push(c.element.id);
        }
      } else if (c.type === "delete") {
        delete d.elements[c.elementId];
        d.order = d.order.filter(function (id) { return id !== c.elementId; });
      } else if (c.type === "reorder") {
        d.order = c.order.filter(function (id) { return id in d.elements; });
      }
    });
    if (data.slide_index === state.slide_index) {
      renderDrawing();
    }
  }

  function renderDrawing() {
    var layer = document.getElementById("drawing-layer");
    if (!layer) {
      return;
    }
    var d = slideDrawing(state.slide_index);
    var parts = d.order.map(function (id) {
      var el = d.elements[id];
      if (!el || !Array.isArray(el.points)) {
        return "";
      }
      var pts = el.points.map(function (p) { return p[0] + "," + p[1]; }).join(" ");
      return '<polyline fill="none" stroke-linecap="round" stroke-linejoin="round" points="' + pts +
        '" stroke="' + String(el.color || "#e53935").replace(/"/g, "") +
        '" stroke-width="' + Number(el.width || 0.5) + '"></polyline>';
    });
    layer.innerHTML = parts.join("");
  }

  function api(method, path) {
    var headers = {};
    if (token) {
      headers["x-presenter-token"] = token;
    }
    return fetch(path, { method: method, headers: headers }).then(function (r) {
      return r.ok ? r.json() : Promise.reject(r.status);
    });
  }

  function postJson(path, body) {
    return fetch(path, {
      method: "POST",
      headers: { "content-type": "application/json", "x-presenter-token": token },
      body: JSON.stringify(body)
    });
  }

  function local(path) {
    var q = "?slide_index=" + state.slide_index + "&clicks=" + state.clicks;
    return api("GET", "/api/slide/" + path + q).then(function (data) {
      setFollowing(false);
      applyResync(data);
      return api("GET", "/api/drawing/" + data.slide_index);
    }).then(applyDrawing).catch(function () {});
  }

  function follow() {
    api("GET", "/api/state").then(function (s) {
      return api("GET", "/api/slide/" + s.slide_index + "?clicks=" + s.clicks);
    }).then(function (data) {
      applyResync(data);
      setFollowing(true);
      return api("GET", "/api/drawing/" + data.slide_index);
    }).then(applyDrawing).catch(function () {});
  }

  function presenterNav(path) {
    api("POST", "/api/presenter/" + path).then(applyResync).catch(function () {});
  }

  function nav(kind) {
    if (presenter) {
      presenterNav(kind);
    } else {
      local(kind);
    }
  }

  function gotoStep(index, clicks) {
    if (presenter) {
      presenterNav("goto/" + index + "?clicks=" + clicks);
    } else {
      api("GET", "/api/slide/" + index + "?clicks=" + clicks).then(function (data) {
        setFollowing(false);
        applyResync(data);
        return api("GET", "/api/drawing/" + data.slide_index);
      }).then(applyDrawing).catch(function () {});
    }
  }

  function deepLink() {
    var m = /^#(\d+)(?:\.(\d+))?$/.exec(location.hash);
    if (!m) {
      return false;
    }
    var index = Math.max(0, Number(m[1]) - 1);
    var clicks = m[2] ? Number(m[2]) : 0;
    if (index === state.slide_index && clicks === state.clicks) {
      return false;
    }
    gotoStep(index, clicks);
    return true;
  }

  var events = new EventSource("/api/events" + (token ? "?token=" + encodeURIComponent(token) : ""));
  events.addEventListener("state", function (e) {
    if (following) {
      applyResync(JSON.parse(e.data));
    }
  });
  events.addEventListener("content", function (e) {
    var data = JSON.parse(e.data);
    if (!following && data.target === "slide-content") {
      return;
    }
    setContent(data.target, data.html);
    if (data.target === "slide-content") {
      applyClicks();
    }
  });
  events.addEventListener("script", function (e) {
    new Function(JSON.parse(e.data).code)();
  });
  events.addEventListener("drawing", function (e) {
    applyDrawing(JSON.parse(e.data));
  });

  // Presenter pen: drag on the slide to draw, release to publish.
  var stroke = null;
  var layer = document.getElementById("drawing-layer");
  function layerPoint(ev) {
    var r = layer.getBoundingClientRect();
    return [
      Math.round(((ev.clientX - r.left) / r.width) * 1600) / 10,
      Math.round(((ev.clientY - r.top) / r.height) * 900) / 10
    ];
  }
  function sendChanges(changes) {
    postJson("/api/presenter/drawing", { slide_index: state.slide_index, changes: changes });
  }
  if (presenter && layer) {
    layer.addEventListener("pointerdown", function (ev) {
      if (!penOn) {
        return;
      }
      stroke = { id: "s" + Date.now().toString(36) + Math.random().toString(36).slice(2, 6), type: "pen", points: [layerPoint(ev)] };
    });
    layer.addEventListener("pointermove", function (ev) {
      if (stroke) {
        stroke.points.push(layerPoint(ev));
        applyDrawing({ slide_index: state.slide_index, changes: [{ type: "update", element: stroke }], snapshot: false });
      }
    });
    layer.addEventListener("pointerup", function () {
      if (stroke) {
        sendChanges([{ type: "create", element: stroke }]);
        stroke = null;
      }
    });
  }

  document.addEventListener("keydown", function (ev) {
    if (ev.target && /input|textarea/i.test(ev.target.tagName)) {
      return;
    }
    switch (ev.key) {
      case "ArrowRight":
      case "PageDown":
      case " ":
        ev.preventDefault();
        nav("next");
        break;
      case "ArrowLeft":
      case "PageUp":
        ev.preventDefault();
        nav("prev");
        break;
      case "Home":
        gotoStep(0, 0);
        break;
      case "End":
        gotoStep(state.total_slides - 1, 0);
        break;
      case "f":
      case "F":
        if (!presenter) {
          follow();
        }
        break;
      case "d":
      case "D":
        if (presenter && layer) {
          penOn = !penOn;
          layer.classList.toggle("drawing-active", penOn);
          var mode = document.getElementById("viewer-mode");
          if (mode) {
            mode.textContent = penOn ? "pen on" : "pen off";
          }
        }
        break;
      case "z":
      case "Z":
        if (presenter) {
          postJson("/api/presenter/drawing/undo", { slide_index: state.slide_index });
        }
        break;
      case "y":
      case "Y":
        if (presenter) {
          postJson("/api/presenter/drawing/redo", { slide_index: state.slide_index });
        }
        break;
      case "c":
      case "C":
        if (presenter) {
          var d = slideDrawing(state.slide_index);
          var changes = d.order.map(function (id) { return { type: "delete", elementId: id }; });
          if (changes.length) {
            sendChanges(changes);
          }
        }
        break;
    }
  });

  window.addEventListener("hashchange", deepLink);

  if (presenter) {
    var started = Date.now();
    setInterval(function () {
      var secs = Math.floor((Date.now() - started) / 1000);
      var timer = document.getElementById("presenter-timer");
      if (timer) {
        timer.textContent = String(Math.floor(secs / 60)).padStart(2, "0") + ":" + String(secs % 60).padStart(2, "0");
      }
    }, 1000);
  }

  if (!deepLink()) {
    applyClicks();
  }
})();
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::deck_with_clicks;

    fn resync() -> Resync {
        Resync {
            slide_index: 1,
            clicks: 2,
            max_clicks: 3,
            total_slides: 4,
        }
    }

    #[test]
    fn test_audience_page_boots_with_state() {
        let deck = deck_with_clicks(&[0, 3, 0, 0]);
        let html = audience_page(&AudienceView {
            deck: &deck,
            theme: &Theme::light(),
            resync: resync(),
            slide_html: "<div id=\"slide-1\">hi</div>",
        });
        assert!(html.contains("<div id=\"slide-content\" class=\"slide-frame\"><div id=\"slide-1\">hi</div></div>"));
        assert!(html.contains("\"mode\":\"audience\""));
        assert!(html.contains("\"token\":null"));
        assert!(html.contains("\"slide_index\":1"));
        assert!(html.contains("--bg: #ffffff;"));
        assert!(html.contains("new EventSource("));
        assert!(!html.contains("presenter-notes-content"));
    }

    #[test]
    fn test_presenter_page_has_side_panels() {
        let deck = deck_with_clicks(&[0, 3, 0, 0]);
        let html = presenter_page(&PresenterView {
            deck: &deck,
            theme: &Theme::dark(),
            resync: resync(),
            slide_html: "<p>now</p>",
            next_html: "<p>soon</p>",
            notes_html: "<p>remember</p>",
            token: "abc123",
        });
        assert!(html.contains("<div id=\"presenter-next\" class=\"presenter-next\"><p>soon</p></div>"));
        assert!(html.contains("<p>remember</p>"));
        assert!(html.contains("\"token\":\"abc123\""));
        assert!(html.contains("class=\"mode-presenter\""));
    }

    #[test]
    fn test_title_is_escaped() {
        let mut deck = deck_with_clicks(&[0]);
        deck.config.title = "<Talk & Co>".to_string();
        let html = audience_page(&AudienceView {
            deck: &deck,
            theme: &Theme::light(),
            resync: Resync {
                slide_index: 0,
                clicks: 0,
                max_clicks: 0,
                total_slides: 1,
            },
            slide_html: "",
        });
        assert!(html.contains("<title>&lt;Talk &amp; Co&gt;</title>"));
    }

    #[test]
    fn test_access_denied() {
        let html = access_denied_page();
        assert!(html.contains("<h1>Access Denied</h1>"));
        assert!(!html.contains("EventSource"));
    }
}
