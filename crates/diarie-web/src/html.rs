//! Server-rendered HTML pages.
//!
//! Pages are plain `format!` templates. Every value that originates from the
//! database or the request goes through [`escape`].

use std::fmt::Write as _;

use chrono::NaiveDate;
use diarie_core::{
  case::{CaseDetail, CaseForm, CaseSummary, Direction, NoteForm, Status},
  dimension::{Dossier, Handler, Registry, Unit},
};

pub fn escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
    .replace('\'', "&#39;")
}

fn date(d: Option<NaiveDate>) -> String { d.map(|d| d.to_string()).unwrap_or_default() }

fn opt(s: Option<&str>) -> String { s.map(escape).unwrap_or_default() }

// ─── Layout ──────────────────────────────────────────────────────────────────

/// Page furniture around the main content.
#[derive(Default)]
pub struct Chrome<'a> {
  pub title: &'a str,
  /// Logged-in username; shows the logout button.
  pub user:  Option<&'a str>,
  pub flash: Option<&'a str>,
  /// Error banner shown above the content.
  pub error: Option<&'a str>,
}

pub fn layout(chrome: &Chrome<'_>, body: &str) -> String {
  let nav = match chrome.user {
    Some(user) => format!(
      r#"<nav><a href="/">Ärenden</a> <a href="/case/new">Nytt ärende</a>
<form method="post" action="/auth/logout" class="inline"><span>{}</span> <button>Logga ut</button></form></nav>"#,
      escape(user)
    ),
    None => String::new(),
  };
  let flash = chrome
    .flash
    .map(|m| format!(r#"<p class="flash">{}</p>"#, escape(m)))
    .unwrap_or_default();
  let error = chrome
    .error
    .map(|m| format!(r#"<p class="error">{}</p>"#, escape(m)))
    .unwrap_or_default();

  format!(
    r#"<!DOCTYPE html>
<html lang="sv">
<head>
<meta charset="utf-8">
<title>{title} – Diarie</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
table {{ border-collapse: collapse; }}
td, th {{ border-bottom: 1px solid #ddd; padding: .3rem .6rem; text-align: left; }}
.flash {{ background: #e6f4ea; padding: .5rem; }}
.error {{ background: #fce8e6; padding: .5rem; }}
.inline {{ display: inline; }}
label {{ display: block; margin-top: .5rem; }}
</style>
</head>
<body>
{nav}
<h1>{title}</h1>
{flash}{error}
{body}
</body>
</html>"#,
    title = escape(chrome.title),
  )
}

pub fn message_page(title: &str, text: &str) -> String {
  layout(&Chrome { title, ..Chrome::default() }, &format!("<p>{}</p>", escape(text)))
}

// ─── Case list ───────────────────────────────────────────────────────────────

pub fn case_list(cases: &[CaseSummary]) -> String {
  if cases.is_empty() {
    return "<p>Inga ärenden registrerade.</p>".to_owned();
  }

  let mut rows = String::new();
  for c in cases {
    let _ = write!(
      rows,
      r#"<tr><td><a href="/case/{n}">{n}</a></td><td>{reg}</td><td>{subject}</td><td>{dir}</td><td>{status}</td><td>{handler}</td><td>{registered}</td></tr>
"#,
      n = c.case.case_number,
      reg = escape(c.registry_name.as_deref().unwrap_or(&c.case.registry_id)),
      subject = escape(&c.case.subject_text),
      dir = c.case.direction.label(),
      status = c.case.status.label(),
      handler = opt(c.handler_name.as_deref()),
      registered = date(c.case.registered_date),
    );
  }

  format!(
    "<table>\n<tr><th>Dnr</th><th>Registrator</th><th>Ärendemening</th><th>Riktning</th>\
     <th>Status</th><th>Handläggare</th><th>Registrerad</th></tr>\n{rows}</table>"
  )
}

// ─── Case detail ─────────────────────────────────────────────────────────────

pub fn case_detail(detail: &CaseDetail, handlers: &[Handler], note: &NoteForm) -> String {
  let s = &detail.case;
  let c = &s.case;
  let mut out = format!(
    r#"<p><a href="/case/{n}/edit">Redigera</a></p>
<dl>
<dt>Diarienummer</dt><dd>{n}</dd>
<dt>Ärendemening</dt><dd>{subject}</dd>
<dt>Registrator</dt><dd>{registry}</dd>
<dt>Riktning</dt><dd>{direction}</dd>
<dt>Status</dt><dd>{status}</dd>
<dt>Handläggare</dt><dd>{handler}</dd>
<dt>Enhet</dt><dd>{unit}</dd>
<dt>Dossier</dt><dd>{dossier}</dd>
<dt>Inkommet/upprättat</dt><dd>{received}</dd>
<dt>Registrerat</dt><dd>{registered}</dd>
<dt>Avslutat</dt><dd>{closed}</dd>
<dt>Motpartens beteckning</dt><dd>{counterpart}</dd>
<dt>Från/till</dt><dd>{correspondent}</dd>
</dl>
"#,
    n = c.case_number,
    subject = escape(&c.subject_text),
    registry = escape(s.registry_name.as_deref().unwrap_or(&c.registry_id)),
    direction = c.direction.label(),
    status = c.status.label(),
    handler = opt(s.handler_name.as_deref()),
    unit = opt(s.unit_name.as_deref()),
    dossier = opt(s.dossier_name.as_deref()),
    received = date(c.received_date),
    registered = date(c.registered_date),
    closed = date(c.closed_date),
    counterpart = escape(&c.counterpart_reference),
    correspondent = escape(&c.correspondent),
  );

  out.push_str("<h2>Anteckningar</h2>\n");
  if detail.notes.is_empty() {
    out.push_str("<p>Inga anteckningar.</p>\n");
  } else {
    out.push_str(
      "<table>\n<tr><th>Nr</th><th>Riktning</th><th>Text</th><th>Inkommen</th><th>Utgående</th>\
       <th>Handläggare</th><th>Motpart</th></tr>\n",
    );
    for row in &detail.notes {
      let n = &row.note;
      let _ = writeln!(
        out,
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        n.line_number,
        n.direction.label(),
        escape(&n.text),
        date(n.received_date),
        date(n.sent_date),
        opt(row.handler_name.as_deref()),
        escape(&n.counterpart),
      );
    }
    out.push_str("</table>\n");
  }

  let _ = write!(
    out,
    r#"<h3>Ny anteckning</h3>
<form method="post" action="/case/{n}/note">
<label>Riktning {direction}</label>
<label>Text <textarea name="text" rows="3" cols="60">{text}</textarea></label>
<label>Handläggare {handler}</label>
<label>Motpart <input name="counterpart" value="{counterpart}"></label>
<button>Lägg till</button>
</form>
"#,
    n = c.case_number,
    direction = direction_select(note.direction.as_deref()),
    text = opt(note.text.as_deref()),
    handler = select(
      "handler_id",
      true,
      note.handler_id.as_deref(),
      handlers.iter().map(|h| (h.id.as_str(), h.name.as_str())),
    ),
    counterpart = opt(note.counterpart.as_deref()),
  );

  out.push_str("<h2>Logg</h2>\n");
  if detail.logs.is_empty() {
    out.push_str("<p>Ingen logg.</p>\n");
  } else {
    out.push_str("<table>\n<tr><th>Tid</th><th>Registrator</th><th>Händelse</th></tr>\n");
    for row in &detail.logs {
      let e = &row.entry;
      let _ = writeln!(
        out,
        "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
        e.logged_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default(),
        escape(row.registry_name.as_deref().unwrap_or(&e.registry_id)),
        escape(&e.description),
      );
    }
    out.push_str("</table>\n");
  }

  out
}

// ─── Case form ───────────────────────────────────────────────────────────────

/// Dropdown contents for the case form.
pub struct Choices {
  pub registries: Vec<Registry>,
  pub handlers:   Vec<Handler>,
  pub units:      Vec<Unit>,
  pub dossiers:   Vec<Dossier>,
}

pub fn case_form(action: &str, submit: &str, form: &CaseForm, choices: &Choices) -> String {
  let dossiers: Vec<(String, &str)> = choices
    .dossiers
    .iter()
    .map(|d| (d.number.to_string(), d.name.as_str()))
    .collect();

  format!(
    r#"<form method="post" action="{action}">
<label>Registrator {registry}</label>
<label>Riktning {direction}</label>
<label>Status {status}</label>
<label>Ärendemening <input name="subject_text" size="60" value="{subject}"></label>
<label>Handläggare {handler}</label>
<label>Enhet {unit}</label>
<label>Dossier {dossier}</label>
<label>Inkommet/upprättat <input type="date" name="received_date" value="{received}"></label>
<label>Registrerat <input type="date" name="registered_date" value="{registered}"></label>
<label>Avslutat <input type="date" name="closed_date" value="{closed}"></label>
<label>Motpartens beteckning <input name="counterpart_reference" value="{counterpart}"></label>
<label>Från/till <input name="correspondent" value="{correspondent}"></label>
<button>{submit}</button>
</form>"#,
    action = escape(action),
    registry = select(
      "registry_id",
      false,
      form.registry_id.as_deref(),
      choices.registries.iter().map(|r| (r.id.as_str(), r.name.as_str())),
    ),
    direction = direction_select(form.direction.as_deref()),
    status = select(
      "status",
      false,
      form.status.as_deref(),
      Status::ALL.iter().map(|s| (s.as_str(), s.label())),
    ),
    subject = opt(form.subject_text.as_deref()),
    handler = select(
      "handler_id",
      true,
      form.handler_id.as_deref(),
      choices.handlers.iter().map(|h| (h.id.as_str(), h.name.as_str())),
    ),
    unit = select(
      "unit_code",
      true,
      form.unit_code.as_deref(),
      choices.units.iter().map(|u| (u.code.as_str(), u.name.as_str())),
    ),
    dossier = select(
      "dossier_number",
      true,
      form.dossier_number.as_deref(),
      dossiers.iter().map(|(n, name)| (n.as_str(), *name)),
    ),
    received = opt(form.received_date.as_deref()),
    registered = opt(form.registered_date.as_deref()),
    closed = opt(form.closed_date.as_deref()),
    counterpart = opt(form.counterpart_reference.as_deref()),
    correspondent = opt(form.correspondent.as_deref()),
    submit = escape(submit),
  )
}

fn direction_select(selected: Option<&str>) -> String {
  select(
    "direction",
    false,
    selected,
    Direction::ALL.iter().map(|d| (d.as_str(), d.label())),
  )
}

/// A `<select>`; `blank` adds an empty first option meaning "none".
fn select<'a>(
  name: &str,
  blank: bool,
  selected: Option<&str>,
  options: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
  let mut out = format!(r#"<select name="{name}">"#);
  if blank {
    out.push_str(r#"<option value="">–</option>"#);
  }
  for (value, label) in options {
    let mark = if selected == Some(value) { " selected" } else { "" };
    let _ = write!(out, r#"<option value="{}"{mark}>{}</option>"#, escape(value), escape(label));
  }
  out.push_str("</select>");
  out
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub fn login_form(next: &str, username: &str) -> String {
  format!(
    r#"<form method="post" action="/auth/login">
<input type="hidden" name="next" value="{next}">
<label>Användarnamn <input name="username" value="{username}" autofocus></label>
<label>Lösenord <input type="password" name="password"></label>
<label><input type="checkbox" name="remember" value="1"> Kom ihåg mig</label>
<button>Logga in</button>
</form>"#,
    next = escape(next),
    username = escape(username),
  )
}

pub fn setup_form(username: &str) -> String {
  format!(
    r#"<p>Inga konton finns ännu. Skapa det första administratörskontot.</p>
<form method="post" action="/auth/setup">
<label>Användarnamn <input name="username" value="{username}" autofocus></label>
<label>Lösenord <input type="password" name="password"></label>
<label>Upprepa lösenord <input type="password" name="confirm"></label>
<button>Skapa konto</button>
</form>"#,
    username = escape(username),
  )
}
