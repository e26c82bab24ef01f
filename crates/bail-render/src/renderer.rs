//! Deterministic HTML renderer
//!
//! Walks an [`Outline`] over a [`DocumentState`] snapshot. The output depends
//! only on the state and the schema: no clock, no randomness, no map
//! iteration order.

use crate::error::RenderStructuralError;
use crate::format::{escape_html, format_value};
use crate::outline::{Node, Outline};
use crate::report;
use bail_schema::{ContentDigest, FieldPath, FieldSpec, Schema};
use bail_state::DocumentState;
use serde::{Deserialize, Serialize};

const STYLE: &str = "body{font-family:Georgia,serif;font-size:11pt;line-height:1.45;margin:0}\
.contrat{max-width:48em;margin:2em auto;padding:0 1.5em}\
h1{text-align:center;font-size:15pt}\
.subtitle{text-align:center;font-style:italic}\
h2{font-size:12pt;margin-top:1.6em;border-bottom:1px solid #444}\
h3{font-size:11pt;margin-top:1.1em}\
.label{font-weight:bold}\
.blank{background:#fff3b0;color:#7a5b00;padding:0 .2em}\
.empty{font-style:italic}\
.item{margin-left:1em}\
table.signatures{width:100%;margin-top:1.5em;border-collapse:collapse}\
table.signatures td{vertical-align:top;height:7em;padding:.5em;border:1px solid #999}\
.footer{margin-top:2.5em;font-size:9pt;text-align:center}";

const BLANK_TEXT: &str = "[à compléter]";

/// Rendered document with its completeness figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    /// Self-contained HTML document
    pub document: String,
    /// Visible required paths without a value, in declaration order
    pub unresolved: Vec<FieldPath>,
    /// `true` iff `unresolved` is empty
    pub complete: bool,
    /// State version the document was rendered from
    pub state_version: u64,
    /// Fingerprint of the schema used
    pub schema_fingerprint: ContentDigest,
    /// Blake3 digest of `document`
    pub digest: ContentDigest,
}

/// Render `state` through `outline`
///
/// Missing data never fails: unset required fields become blank markers.
///
/// # Errors
/// Returns [`RenderStructuralError`] if the outline does not match `schema`
pub fn render(
    state: &DocumentState,
    schema: &Schema,
    outline: &Outline,
) -> Result<RenderResult, RenderStructuralError> {
    outline.check(schema)?;

    let mut writer = Writer {
        schema,
        state,
        out: String::with_capacity(32 * 1024),
    };
    writer.document(outline)?;

    let document = writer.out;
    let unresolved = report::unresolved(state, schema);
    tracing::debug!(
        version = state.version(),
        unresolved = unresolved.len(),
        bytes = document.len(),
        "rendered document"
    );
    Ok(RenderResult {
        digest: ContentDigest::compute(document.as_bytes()),
        complete: unresolved.is_empty(),
        unresolved,
        state_version: state.version(),
        schema_fingerprint: schema.fingerprint(),
        document,
    })
}

struct Writer<'a> {
    schema: &'a Schema,
    state: &'a DocumentState,
    out: String,
}

impl<'a> Writer<'a> {
    fn document(&mut self, outline: &Outline) -> Result<(), RenderStructuralError> {
        let title = escape_html(outline.title());
        self.out
            .push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"utf-8\">\n");
        self.out.push_str(&format!("<title>{title}</title>\n<style>{STYLE}</style>\n"));
        self.out.push_str("</head>\n<body>\n<article class=\"contrat\">\n");
        self.out.push_str(&format!("<h1>{title}</h1>\n"));
        if let Some(subtitle) = outline.subtitle() {
            self.out
                .push_str(&format!("<p class=\"subtitle\">{}</p>\n", escape_html(subtitle)));
        }
        self.nodes(outline.body(), None)?;
        if let Some(footer) = outline.footer() {
            self.out
                .push_str(&format!("<p class=\"footer\">{}</p>\n", escape_html(footer)));
        }
        self.out.push_str("</article>\n</body>\n</html>\n");
        Ok(())
    }

    /// `item` is the concrete item path (`group[i]`) inside a repeat
    fn nodes(
        &mut self,
        nodes: &[Node],
        item: Option<&FieldPath>,
    ) -> Result<(), RenderStructuralError> {
        for node in nodes {
            self.node(node, item)?;
        }
        Ok(())
    }

    fn node(
        &mut self,
        node: &Node,
        item: Option<&FieldPath>,
    ) -> Result<(), RenderStructuralError> {
        match node {
            Node::Heading(text) => self.out.push_str(&format!("<h2>{}</h2>\n", escape_html(text))),
            Node::Subheading(text) => {
                self.out.push_str(&format!("<h3>{}</h3>\n", escape_html(text)));
            }
            Node::Text(text) => self.out.push_str(&format!("<p>{}</p>\n", escape_html(text))),
            Node::Bullets(items) => {
                self.out.push_str("<ul>\n");
                for text in items {
                    self.out.push_str(&format!("<li>{}</li>\n", escape_html(text)));
                }
                self.out.push_str("</ul>\n");
            }
            Node::Field { path, label } => {
                let concrete = match item {
                    Some(base) => base.join(path),
                    None => path.clone(),
                };
                self.field(&concrete, label.as_deref())?;
            }
            Node::When { condition, body } => {
                let (schema, state) = (self.schema, self.state);
                if condition.evaluate(&|p: &FieldPath| schema.effective_value(p, state)) {
                    self.nodes(body, item)?;
                }
            }
            Node::Repeat { group, empty, item: template } => {
                self.repeat(group, empty.as_deref(), template)?;
            }
            Node::Signatures(labels) => self.signatures(labels),
        }
        Ok(())
    }

    fn spec(&self, path: &FieldPath) -> Result<&'a FieldSpec, RenderStructuralError> {
        self.schema
            .resolve(path)
            .map_err(|_| RenderStructuralError::UndeclaredPath(path.to_string()))
    }

    fn field(
        &mut self,
        path: &FieldPath,
        label: Option<&str>,
    ) -> Result<(), RenderStructuralError> {
        let spec = self.spec(path)?;
        if !self.schema.spec_visible(spec, self.state) {
            return Ok(());
        }
        let label = escape_html(label.unwrap_or_else(|| spec.label()));
        match self.state.get(path) {
            Some(value) => self.out.push_str(&format!(
                "<p class=\"field\"><span class=\"label\">{label}</span> : <span class=\"value\">{}</span></p>\n",
                format_value(value, spec.kind())
            )),
            None if spec.is_required() => self.out.push_str(&format!(
                "<p class=\"field\"><span class=\"label\">{label}</span> : {}</p>\n",
                blank(path)
            )),
            None => {}
        }
        Ok(())
    }

    fn repeat(
        &mut self,
        group: &FieldPath,
        empty: Option<&str>,
        template: &[Node],
    ) -> Result<(), RenderStructuralError> {
        let spec = self.spec(group)?;
        let Some(rule) = spec.list_rule() else {
            return Err(RenderStructuralError::NotAGroup(group.to_string()));
        };
        if !self.schema.spec_visible(spec, self.state) {
            return Ok(());
        }
        let min_items = rule.min_items;
        let count = self.state.item_count(group);

        self.out.push_str(&format!(
            "<div class=\"group\" data-path=\"{}\">\n",
            escape_html(&group.to_string())
        ));
        if count == 0 {
            if let Some(text) = empty {
                self.out
                    .push_str(&format!("<p class=\"empty\">{}</p>\n", escape_html(text)));
            }
        }
        for index in 0..count {
            self.out
                .push_str(&format!("<div class=\"item\" data-index=\"{index}\">\n"));
            self.nodes(template, Some(&group.item(index)))?;
            self.out.push_str("</div>\n");
        }
        if count < min_items {
            self.out.push_str(&format!("<p>{}</p>\n", blank(group)));
        }
        self.out.push_str("</div>\n");
        Ok(())
    }

    fn signatures(&mut self, labels: &[String]) {
        self.out.push_str("<table class=\"signatures\"><tr>\n");
        for label in labels {
            self.out.push_str(&format!(
                "<td><span class=\"label\">{}</span><br><small>(précédée de la mention « Lu et approuvé »)</small></td>\n",
                escape_html(label)
            ));
        }
        self.out.push_str("</tr></table>\n");
    }
}

fn blank(path: &FieldPath) -> String {
    format!(
        "<span class=\"blank\" data-path=\"{}\">{BLANK_TEXT}</span>",
        escape_html(&path.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bail_state::MutationOp;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    fn fixtures() -> (Schema, Outline) {
        let schema = Schema::furnished_lease().unwrap();
        let outline = Outline::furnished_lease(&schema).unwrap();
        (schema, outline)
    }

    fn apply(state: &mut DocumentState, schema: &Schema, ops: serde_json::Value) {
        let ops: Vec<MutationOp> = serde_json::from_value(ops).unwrap();
        for op in ops {
            op.apply(state, schema).unwrap();
        }
    }

    fn minimal(state: &mut DocumentState, schema: &Schema) {
        apply(
            state,
            schema,
            json!([
                {"op": "set", "path": "designation_parties.bailleur.nom_prenom_ou_denomination", "value": "Jean Dupont"},
                {"op": "set", "path": "designation_parties.bailleur.adresse_siege_social", "value": "12 rue des Lilas, 75011 Paris"},
                {"op": "append_list_item", "group": "designation_parties.locataires"},
                {"op": "set", "path": "designation_parties.locataires[0].nom_prenom", "value": "Claire Martin"},
                {"op": "set", "path": "duree_contrat.date_prise_effet", "value": "2025-09-01"},
                {"op": "set", "path": "conditions_financieres.loyer.montant_hors_charges", "value": 1500},
                {"op": "set", "path": "garanties.montant_depot_garantie", "value": "3000"}
            ]),
        );
    }

    #[test]
    fn empty_session_renders_skeleton() {
        let (schema, outline) = fixtures();
        let state = DocumentState::new();
        let result = render(&state, &schema, &outline).unwrap();

        assert!(!result.complete);
        assert_eq!(
            result.unresolved,
            vec![
                path("designation_parties.bailleur.nom_prenom_ou_denomination"),
                path("designation_parties.bailleur.adresse_siege_social"),
                path("designation_parties.locataires"),
                path("duree_contrat.date_prise_effet"),
                path("conditions_financieres.loyer.montant_hors_charges"),
                path("garanties.montant_depot_garantie"),
            ]
        );
        for p in &result.unresolved {
            assert!(
                result
                    .document
                    .contains(&format!("class=\"blank\" data-path=\"{p}\"")),
                "no blank marker for {p}"
            );
        }
        assert!(result.document.contains("I. DÉSIGNATION DES PARTIES"));
        assert!(result.document.contains("X. ANNEXES"));
        assert!(result.document.contains("Aucun garant."));
        assert_eq!(result.state_version, 0);
    }

    #[test]
    fn minimal_valid_session_is_complete() {
        let (schema, outline) = fixtures();
        let mut state = DocumentState::new();
        minimal(&mut state, &schema);
        let result = render(&state, &schema, &outline).unwrap();

        assert!(result.complete, "unresolved: {:?}", result.unresolved);
        assert!(result.unresolved.is_empty());
        assert!(!result.document.contains("class=\"blank\""));
        assert!(result.document.contains("1500,00 €"));
        assert!(result.document.contains("3000,00 €"));
        assert!(result.document.contains("01/09/2025"));
        assert!(result.document.contains("Claire Martin"));
        assert!(result.document.contains("Aucun garant."));
        assert_eq!(result.state_version, state.version());
    }

    #[test]
    fn family_company_line_needs_type_and_answer() {
        let (schema, outline) = fixtures();
        let line = "Société civile constituée exclusivement";
        let mut state = DocumentState::new();
        minimal(&mut state, &schema);
        assert!(!render(&state, &schema, &outline)
            .unwrap()
            .document
            .contains(line));

        apply(
            &mut state,
            &schema,
            json!([{"op": "set", "path": "designation_parties.bailleur.type_personne", "value": "Personne morale"}]),
        );
        let typed_only = render(&state, &schema, &outline).unwrap();
        assert!(!typed_only.document.contains(line));
        assert!(typed_only.complete, "unresolved: {:?}", typed_only.unresolved);

        apply(
            &mut state,
            &schema,
            json!([{"op": "set", "path": "designation_parties.bailleur.societe_civile_familiale", "value": "non"}]),
        );
        let answered = render(&state, &schema, &outline).unwrap();
        assert!(answered.document.contains(line));
        assert!(answered.document.contains("<span class=\"value\">Non</span>"));
        assert!(answered.complete);
    }

    #[test]
    fn rendering_is_idempotent() {
        let (schema, outline) = fixtures();
        let mut state = DocumentState::new();
        minimal(&mut state, &schema);
        let a = render(&state, &schema, &outline).unwrap();
        let b = render(&state.clone(), &schema, &outline).unwrap();
        assert_eq!(a.document, b.document);
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn conditional_clause_follows_predicate() {
        let (schema, outline) = fixtures();
        let mut state = DocumentState::new();
        let solidarity = "VII. CLAUSE DE SOLIDARITÉ";
        assert!(!render(&state, &schema, &outline)
            .unwrap()
            .document
            .contains(solidarity));

        apply(
            &mut state,
            &schema,
            json!([{"op": "set", "path": "colocation.est_colocation", "value": true}]),
        );
        assert!(render(&state, &schema, &outline)
            .unwrap()
            .document
            .contains(solidarity));

        apply(
            &mut state,
            &schema,
            json!([{"op": "set", "path": "colocation.est_colocation", "value": "non"}]),
        );
        assert!(!render(&state, &schema, &outline)
            .unwrap()
            .document
            .contains(solidarity));
    }

    #[test]
    fn hidden_values_are_not_printed() {
        let (schema, outline) = fixtures();
        let mut state = DocumentState::new();
        apply(
            &mut state,
            &schema,
            json!([{"op": "set", "path": "travaux.description", "value": "Réfection de la cuisine"}]),
        );
        let hidden = render(&state, &schema, &outline).unwrap();
        assert!(!hidden.document.contains("Réfection de la cuisine"));
        assert!(hidden.document.contains("Travaux effectués depuis le dernier bail : néant"));

        apply(
            &mut state,
            &schema,
            json!([{"op": "set", "path": "travaux.effectues_depuis_dernier_bail", "value": "oui"}]),
        );
        let shown = render(&state, &schema, &outline).unwrap();
        assert!(shown.document.contains("Réfection de la cuisine"));
        assert!(!shown
            .document
            .contains("Travaux effectués depuis le dernier bail : néant"));
    }

    #[test]
    fn required_item_fields_get_markers() {
        let (schema, outline) = fixtures();
        let mut state = DocumentState::new();
        apply(
            &mut state,
            &schema,
            json!([{"op": "append_list_item", "group": "designation_parties.garants"}]),
        );
        let result = render(&state, &schema, &outline).unwrap();
        assert!(result
            .document
            .contains("data-path=\"designation_parties.garants[0].noms\""));
        assert!(result
            .unresolved
            .contains(&path("designation_parties.garants[0].adresse")));
        assert!(!result.document.contains("Aucun garant."));
    }

    #[test]
    fn user_text_is_escaped() {
        let (schema, outline) = fixtures();
        let mut state = DocumentState::new();
        apply(
            &mut state,
            &schema,
            json!([{"op": "set", "path": "designation_parties.bailleur.nom_prenom_ou_denomination", "value": "<script>alert(1)</script>"}]),
        );
        let result = render(&state, &schema, &outline).unwrap();
        assert!(!result.document.contains("<script>"));
        assert!(result.document.contains("&lt;script&gt;"));
    }

    #[test]
    fn outline_from_other_schema_is_structural_error() {
        let (schema, _) = fixtures();
        let other = Schema::from_yaml_str(&format!(
            "{}\n# revision\n",
            bail_schema::FURNISHED_LEASE_SOURCE
        ))
        .unwrap();
        let outline = Outline::furnished_lease(&other).unwrap();
        assert!(matches!(
            render(&DocumentState::new(), &schema, &outline),
            Err(RenderStructuralError::SchemaMismatch { .. })
        ));
    }
}
