use std::fmt::Write;

use crate::model::EngineStatus;
use crate::risk::{Assessment, Verdict};
use crate::verification::IssuedCode;

const STYLE: &str = r#"
body { font-family: sans-serif; background: #f8fafc; color: #1e293b; margin: 0; display: flex; }
aside { background: #1e293b; color: #fff; width: 16rem; min-height: 100vh; padding: 1.5rem; }
main { flex: 1; padding: 2rem; max-width: 48rem; }
h1, h2 { color: #1e40af; }
.card { background: #fff; border: 1px solid #e2e8f0; border-radius: 10px; padding: 1.25rem; margin-bottom: 1.25rem; }
.online { color: #22c55e; } .offline { color: #ef4444; }
.result { padding: 1.25rem; border-radius: 10px; text-align: center; font-weight: bold; font-size: 1.5rem; margin: 1.25rem 0; }
.fraud { background: #fee2e2; color: #b91c1c; border: 2px solid #ef4444; }
.safe { background: #dcfce7; color: #15803d; border: 2px solid #22c55e; }
.warning { background: #fef9c3; border: 1px solid #eab308; padding: 0.75rem; border-radius: 8px; }
label { display: block; margin-top: 0.75rem; }
button { background: #2563eb; color: #fff; border: none; border-radius: 8px; padding: 0.75rem; width: 100%; margin-top: 1rem; }
"#;

/// What happened on the last submission, if anything.
#[derive(Debug, Clone)]
pub enum Outcome {
    Assessed(Assessment),
    Warning(String),
}

/// Everything the form page needs to render.
#[derive(Debug, Clone)]
pub struct PageView {
    pub engine: EngineStatus,
    pub session: Option<IssuedCode>,
    pub amount: String,
    pub elapsed_time: String,
    pub outcome: Option<Outcome>,
}

impl PageView {
    pub fn new(engine: EngineStatus, session: Option<IssuedCode>) -> Self {
        Self {
            engine,
            session,
            amount: "100.00".into(),
            elapsed_time: "0".into(),
            outcome: None,
        }
    }
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn render_sidebar(out: &mut String, view: &PageView) {
    let _ = write!(out, "<aside><h2>SecurePay AI</h2><h3>System Status</h3><hr>");
    if view.engine.online {
        let _ = write!(out, r#"<p class="online">Core Engine: ONLINE</p>"#);
        if let Some(kind) = &view.engine.model_kind {
            let _ = write!(out, "<p><small>Model: {}</small></p>", escape(kind));
        }
    } else {
        let _ = write!(
            out,
            r#"<p class="offline">Core Engine: OFFLINE</p><p><small>Check that a model artifact exists at one of the configured MODEL_PATHS.</small></p>"#
        );
    }

    if let Some(session) = &view.session {
        let _ = write!(
            out,
            r#"<form method="post" action="/regenerate"><input type="hidden" name="session_id" value="{}"><button type="submit">Regenerate Security Code</button></form>"#,
            session.session_id
        );
    }
    out.push_str("</aside>");
}

fn render_outcome(out: &mut String, outcome: &Outcome) {
    match outcome {
        Outcome::Assessed(a) => {
            let (class, banner) = match a.verdict {
                Verdict::Fraudulent => ("fraud", "FRAUDULENT TRANSACTION DETECTED"),
                Verdict::Secure => ("safe", "TRANSACTION IS SECURE"),
            };
            let _ = write!(
                out,
                r#"<div class="result {class}">{banner}</div><p>{}</p>"#,
                escape(&a.message())
            );
        }
        Outcome::Warning(msg) => {
            let _ = write!(out, r#"<p class="warning">{}</p>"#, escape(msg));
        }
    }
}

fn render_form(out: &mut String, view: &PageView, session: &IssuedCode) {
    let _ = write!(
        out,
        r#"<form method="post" action="/analyze">
<input type="hidden" name="session_id" value="{session_id}">
<div class="card"><h2>Transaction Details</h2>
<label>Transaction Amount ($) <input type="number" name="amount" min="0" step="0.01" value="{amount}"></label>
<label>Time Elapsed (Seconds) <input type="number" name="elapsed_time" min="0" step="any" value="{elapsed}"></label>
</div>
<div class="card"><h2>Security Check</h2>
<p>Security Code: <strong>{code}</strong></p>
<label>Enter Code <input type="text" name="code" placeholder="Type code here" autocomplete="off"></label>
<button type="submit">Analyze Transaction</button>
</div>
</form>"#,
        session_id = session.session_id,
        amount = escape(&view.amount),
        elapsed = escape(&view.elapsed_time),
        code = escape(&session.code),
    );
}

/// Render the full page.
pub fn render_page(view: &PageView) -> String {
    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>SecurePay AI</title><style>{STYLE}</style></head><body>"
    );

    render_sidebar(&mut out, view);

    out.push_str("<main><h1>Credit Card Fraud Analysis</h1><p>Transaction monitoring and risk assessment.</p>");

    match (&view.session, view.engine.online) {
        (Some(session), true) => {
            render_form(&mut out, view, session);
            if let Some(outcome) = &view.outcome {
                render_outcome(&mut out, outcome);
            }
        }
        _ => {
            out.push_str(
                r#"<p class="warning"><strong>System Critical:</strong> Model file not detected. Analysis features are disabled.</p>"#,
            );
        }
    }

    out.push_str("<hr><small>SecurePay fraud screening demo</small></main></body></html>");
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EngineState;
    use crate::risk::Reason;
    use uuid::Uuid;

    fn status(online: bool) -> EngineStatus {
        EngineStatus {
            state: if online { EngineState::Loaded } else { EngineState::Unavailable },
            online,
            model_kind: online.then(|| "random_forest".to_string()),
            model_name: None,
            source: None,
            loaded_at: None,
            inference_count: 0,
            avg_latency_ms: 0.0,
        }
    }

    fn session() -> IssuedCode {
        IssuedCode {
            session_id: Uuid::new_v4(),
            code: "4821".into(),
        }
    }

    #[test]
    fn test_offline_page_has_no_form() {
        let html = render_page(&PageView::new(status(false), None));
        assert!(html.contains("Core Engine: OFFLINE"));
        assert!(html.contains("Analysis features are disabled"));
        assert!(!html.contains("action=\"/analyze\""));
    }

    #[test]
    fn test_online_page_shows_code_and_form() {
        let s = session();
        let html = render_page(&PageView::new(status(true), Some(s.clone())));
        assert!(html.contains("Core Engine: ONLINE"));
        assert!(html.contains("<strong>4821</strong>"));
        assert!(html.contains(&s.session_id.to_string()));
        assert!(html.contains("action=\"/analyze\""));
    }

    #[test]
    fn test_fraud_banner() {
        let mut view = PageView::new(status(true), Some(session()));
        view.outcome = Some(Outcome::Assessed(Assessment {
            verdict: Verdict::Fraudulent,
            reason: Reason::AmountThreshold,
            amount: 30_000.0,
            formatted_amount: "$30,000.00".into(),
        }));

        let html = render_page(&view);
        assert!(html.contains("FRAUDULENT TRANSACTION DETECTED"));
        assert!(html.contains("$30,000.00"));
    }

    #[test]
    fn test_user_input_is_escaped() {
        let mut view = PageView::new(status(true), Some(session()));
        view.amount = "\"><script>".into();
        view.outcome = Some(Outcome::Warning("<b>".into()));

        let html = render_page(&view);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;b&gt;"));
    }
}
