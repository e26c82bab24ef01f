//! Property tests for the mutation protocol

use bail_schema::{FieldPath, Schema, Value};
use bail_state::{DocumentState, MutationError, MutationOp};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

fn path(s: &str) -> FieldPath {
    s.parse().unwrap()
}

proptest! {
    #[test]
    fn decimal_set_get_roundtrip(cents in 0u64..10_000_000) {
        let schema = Schema::furnished_lease().unwrap();
        let mut state = DocumentState::new();
        let rent = path("conditions_financieres.loyer.montant_hors_charges");
        let amount = Decimal::new(i64::try_from(cents).unwrap(), 2);

        state.set(&schema, &rent, &json!(amount.to_string())).unwrap();
        prop_assert_eq!(state.get(&rent), Some(&Value::Decimal(amount)));
    }

    #[test]
    fn text_set_get_roundtrip(name in "[A-Za-zéè][A-Za-zéè '-]{0,60}[A-Za-z]") {
        let schema = Schema::furnished_lease().unwrap();
        let mut state = DocumentState::new();
        let landlord = path("designation_parties.bailleur.nom_prenom_ou_denomination");

        state.set(&schema, &landlord, &json!(name.clone())).unwrap();
        prop_assert_eq!(state.get(&landlord), Some(&Value::Text(name)));
    }

    #[test]
    fn date_set_get_roundtrip(days in 0i64..20_000) {
        let schema = Schema::furnished_lease().unwrap();
        let mut state = DocumentState::new();
        let start = path("duree_contrat.date_prise_effet");
        let date =
            chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap() + chrono::Duration::days(days);

        state.set(&schema, &start, &json!(date.format("%Y-%m-%d").to_string())).unwrap();
        prop_assert_eq!(state.get(&start), Some(&Value::Date(date)));
    }

    #[test]
    fn indices_stay_dense(
        appends in 1usize..10,
        removals in proptest::collection::vec(0usize..12, 0..12),
    ) {
        let schema = Schema::furnished_lease().unwrap();
        let mut state = DocumentState::new();
        let group = path("designation_parties.locataires");

        for expected in 0..appends {
            let op = MutationOp::AppendListItem { group: group.clone() };
            op.apply(&mut state, &schema).unwrap();
            let field = group.item(expected).child("nom_prenom");
            state.set(&schema, &field, &json!(format!("T{expected}"))).unwrap();
        }

        let mut len = appends;
        for index in removals {
            let op = MutationOp::RemoveListItem { group: group.clone(), index };
            match op.apply(&mut state, &schema) {
                Ok(_) => {
                    prop_assert!(index < len);
                    len -= 1;
                }
                Err(MutationError::NotFound { .. }) => prop_assert!(index >= len),
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
            prop_assert_eq!(state.item_count(&group), len);
            for i in 0..len {
                let field = group.item(i).child("nom_prenom");
                prop_assert!(state.get(&field).is_some());
            }
            let past_end = group.item(len).child("nom_prenom");
            prop_assert!(
                matches!(
                    state.set(&schema, &past_end, &json!("x")),
                    Err(MutationError::NotFound { .. })
                ),
                "index past the end must be NotFound"
            );
        }
    }

    #[test]
    fn rejected_boolean_literal_changes_nothing(word in "[a-z]{3,8}") {
        prop_assume!(!["true", "false", "oui", "non", "yes"].contains(&word.as_str()));
        let schema = Schema::furnished_lease().unwrap();
        let mut state = DocumentState::new();
        let flag = path("travaux.effectues_depuis_dernier_bail");
        let before = state.clone();

        prop_assert!(state.set(&schema, &flag, &json!(word)).is_err());
        prop_assert_eq!(state, before);
    }
}
