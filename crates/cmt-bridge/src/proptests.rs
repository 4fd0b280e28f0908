use std::sync::OnceLock;

use proptest::prelude::*;

use crate::config::BridgeConfig;
use crate::core::{CmtCore, RequestPayload};
use crate::file_store::validate_alias;

fn shared_core() -> &'static (CmtCore, String) {
    static CORE: OnceLock<(CmtCore, String)> = OnceLock::new();
    CORE.get_or_init(|| {
        let core = CmtCore::new(&BridgeConfig::in_memory()).unwrap();
        let public = core.generate_rsa_key_pair().unwrap().public_key;
        (core, public)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_json_params_round_trip(cmt in any::<String>()) {
        let (core, public) = shared_core();
        let params = serde_json::json!({ "cmt": cmt, "bridgeRaPublicKey": public }).to_string();

        let prepared = core.prepare_request_payload_json(&params).unwrap();
        let parsed = core.parse_response_payload(&prepared.request_data).unwrap();
        prop_assert_eq!(parsed.response_data, cmt);
    }

    #[test]
    fn test_struct_and_json_entry_points_agree(cmt in "[ -~]{0,32}") {
        let (core, public) = shared_core();
        let request = RequestPayload { cmt: cmt.clone(), bridge_ra_public_key: public.clone() };
        let via_struct = core.prepare_request_payload(&request).unwrap();
        let via_json = core
            .prepare_request_payload_json(&serde_json::to_string(&request).unwrap())
            .unwrap();

        // Different ephemeral keys, same plaintext
        prop_assert_ne!(&via_struct.request_data, &via_json.request_data);
        prop_assert_eq!(core.parse_response_payload(&via_struct.request_data).unwrap().response_data, cmt.clone());
        prop_assert_eq!(core.parse_response_payload(&via_json.request_data).unwrap().response_data, cmt);
    }

    #[test]
    fn test_accepted_aliases_stay_in_key_dir(alias in any::<String>()) {
        if validate_alias(&alias).is_ok() {
            prop_assert!(!alias.contains('/'));
            prop_assert!(!alias.contains('\\'));
            prop_assert!(!alias.starts_with('.'));
        }
    }

    #[test]
    fn test_arbitrary_params_never_panic(params in any::<String>()) {
        let (core, _) = shared_core();
        let _ = core.prepare_request_payload_json(&params);
    }
}
