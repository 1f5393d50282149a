//! Property-based tests for the Gemini translation layer
//!
//! These tests verify that the translation between our internal types
//! and the Gemini wire format preserves key invariants:
//! - Message translation never produces empty contents
//! - Text and inline image payloads are preserved verbatim
//! - Roles map onto Gemini's user/model vocabulary

use super::gemini::{GeminiPart, GeminiService};
use super::types::{ContentBlock, ImageSource, LlmMessage, LlmRequest, SystemContent};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_text_block() -> impl Strategy<Value = ContentBlock> {
    "[a-zA-Z0-9 _.!?,@:/₹-]{1,100}".prop_map(|text| ContentBlock::Text { text })
}

fn arb_image_block() -> impl Strategy<Value = ContentBlock> {
    (
        prop_oneof![
            Just("image/png".to_string()),
            Just("image/jpeg".to_string()),
            Just("image/webp".to_string()),
        ],
        "[a-zA-Z0-9+/]{4,48}",
    )
        .prop_map(|(media_type, data)| ContentBlock::Image {
            source: ImageSource::Base64 { media_type, data },
        })
}

fn arb_block() -> impl Strategy<Value = ContentBlock> {
    prop_oneof![3 => arb_text_block(), 1 => arb_image_block()]
}

fn arb_message() -> impl Strategy<Value = LlmMessage> {
    proptest::collection::vec(arb_block(), 1..4).prop_map(LlmMessage::user)
}

fn arb_request() -> impl Strategy<Value = LlmRequest> {
    (
        proptest::collection::vec("[a-zA-Z ]{1,40}", 0..3),
        proptest::collection::vec(arb_message(), 1..5),
    )
        .prop_map(|(system, messages)| LlmRequest {
            system: system.into_iter().map(SystemContent::new).collect(),
            messages,
            max_tokens: None,
            temperature: Some(0.2),
            response_schema: None,
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn every_message_translates_to_one_content(request in arb_request()) {
        let wire = GeminiService::translate_request(&request);
        prop_assert_eq!(wire.contents.len(), request.messages.len());
        for content in &wire.contents {
            prop_assert!(!content.parts.is_empty());
        }
    }

    #[test]
    fn roles_map_to_gemini_vocabulary(request in arb_request()) {
        let wire = GeminiService::translate_request(&request);
        for content in &wire.contents {
            prop_assert_eq!(content.role.as_deref(), Some("user"));
        }
    }

    #[test]
    fn parts_preserve_payloads(request in arb_request()) {
        let wire = GeminiService::translate_request(&request);
        for (msg, content) in request.messages.iter().zip(&wire.contents) {
            prop_assert_eq!(msg.content.len(), content.parts.len());
            for (block, part) in msg.content.iter().zip(&content.parts) {
                match (block, part) {
                    (ContentBlock::Text { text }, GeminiPart::Text { text: wire_text }) => {
                        prop_assert_eq!(text, wire_text);
                    }
                    (
                        ContentBlock::Image { source: ImageSource::Base64 { media_type, data } },
                        GeminiPart::InlineData { inline_data },
                    ) => {
                        prop_assert_eq!(media_type, &inline_data.mime_type);
                        prop_assert_eq!(data, &inline_data.data);
                    }
                    _ => prop_assert!(false, "block kind changed during translation"),
                }
            }
        }
    }

    #[test]
    fn system_instruction_only_when_present(request in arb_request()) {
        let wire = GeminiService::translate_request(&request);
        prop_assert_eq!(wire.system_instruction.is_some(), !request.system.is_empty());
    }
}
