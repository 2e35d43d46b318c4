use super::channel::image_mime;
use super::events::{
    chat_presence_status, describe_quoted, is_user_content, media_attachments, message_text,
    presence_status, quoted_text, should_ignore, unwrap_message,
};
use super::qr::{generate_qr_image, generate_qr_terminal};
use super::reconnect::*;
use super::send::{sanitize_for_whatsapp, split_message, RETRY_DELAY, SEND_ATTEMPTS};
use super::WhatsAppChannel;
use sable_core::config::WhatsAppConfig;
use sable_core::message::{AttachmentType, PresenceStatus};
use std::time::Duration;
use wacore::types::presence::ChatPresence;
use waproto::whatsapp::message::{
    AudioMessage, ExtendedTextMessage, FutureProofMessage, ImageMessage, ProtocolMessage,
    StickerMessage, VideoMessage,
};
use waproto::whatsapp::{ContextInfo, Message};
use wacore_binary::jid::{Jid, JidExt};

fn text_msg(text: &str) -> Message {
    Message {
        conversation: Some(text.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_split_short_message() {
    let chunks = split_message("hello", 4096);
    assert_eq!(chunks, vec!["hello"]);
}

#[test]
fn test_split_long_message_prefers_newlines() {
    let text = "a\n".repeat(3000);
    let chunks = split_message(&text, 4096);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 4096);
        assert!(chunk.ends_with('\n'));
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_split_never_cuts_multibyte_chars() {
    let text = "é".repeat(5000);
    let chunks = split_message(&text, 4095);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 4095);
        assert!(chunk.chars().all(|c| c == 'é'));
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_jid_group_detection() {
    let group_jid: Jid = "120363001234567890@g.us".parse().unwrap();
    assert!(group_jid.is_group());
    let personal_jid: Jid = "923001234567@s.whatsapp.net".parse().unwrap();
    assert!(!personal_jid.is_group());
}

#[test]
fn test_generate_qr_terminal() {
    let qr = generate_qr_terminal("test-data").unwrap();
    assert!(!qr.is_empty());
    assert!(qr.lines().count() > 5);
}

#[test]
fn test_generate_qr_image() {
    let png = generate_qr_image("test-data").unwrap();
    assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[test]
fn test_sanitize_headers() {
    assert_eq!(sanitize_for_whatsapp("## Hello World"), "*HELLO WORLD*");
    assert_eq!(sanitize_for_whatsapp("# Big Title"), "*BIG TITLE*");
    assert_eq!(sanitize_for_whatsapp("### Small"), "*SMALL*");
}

#[test]
fn test_sanitize_bold_and_links() {
    assert_eq!(
        sanitize_for_whatsapp("this is **bold** text"),
        "this is *bold* text"
    );
    assert_eq!(
        sanitize_for_whatsapp("check [Google](https://google.com) and [Rust](https://rust-lang.org)"),
        "check Google (https://google.com) and Rust (https://rust-lang.org)"
    );
}

#[test]
fn test_sanitize_keeps_plain_brackets() {
    assert_eq!(
        sanitize_for_whatsapp("[note] see [docs](https://d.io)"),
        "[note] see docs (https://d.io)"
    );
}

#[test]
fn test_sanitize_tables_and_rules() {
    let input = "| Name | Age |\n|------|-----|\n| Alice | 30 |";
    let result = sanitize_for_whatsapp(input);
    assert!(result.contains("- Name | Age"));
    assert!(result.contains("- Alice | 30"));
    assert!(!result.contains("------"));
    assert_eq!(sanitize_for_whatsapp("above\n---\nbelow"), "above\nbelow");
}

#[test]
fn test_sanitize_passthrough() {
    assert_eq!(sanitize_for_whatsapp("*bold*"), "*bold*");
    assert_eq!(sanitize_for_whatsapp("_italic_"), "_italic_");
    assert_eq!(sanitize_for_whatsapp("```code```"), "```code```");
    let plain = "Assalam-o-Alaikum, kya haal hai?";
    assert_eq!(sanitize_for_whatsapp(plain), plain);
}

#[test]
fn test_retry_is_three_fixed_attempts() {
    assert_eq!(SEND_ATTEMPTS, 3);
    assert_eq!(RETRY_DELAY, Duration::from_secs(2));
}

#[test]
fn test_reconnect_logout_stops() {
    let mut policy = ReconnectPolicy::new();
    assert_eq!(policy.decide(DisconnectReason::LoggedOut), ReconnectDecision::Stop);
}

#[test]
fn test_reconnect_aborts_after_two_conflicts() {
    let mut policy = ReconnectPolicy::new();
    assert_eq!(
        policy.decide(DisconnectReason::Conflict),
        ReconnectDecision::Reconnect(CONFLICT_DELAY)
    );
    assert_eq!(policy.decide(DisconnectReason::Conflict), ReconnectDecision::Abort);
}

#[test]
fn test_reconnect_connect_resets_conflicts() {
    let mut policy = ReconnectPolicy::new();
    policy.decide(DisconnectReason::Conflict);
    policy.on_connected();
    assert_eq!(policy.conflicts(), 0);
    assert_eq!(
        policy.decide(DisconnectReason::Conflict),
        ReconnectDecision::Reconnect(Duration::from_secs(20))
    );
}

#[test]
fn test_reconnect_delays() {
    let mut policy = ReconnectPolicy::new();
    assert_eq!(
        policy.decide(DisconnectReason::Other),
        ReconnectDecision::Reconnect(Duration::from_secs(5))
    );
    assert_eq!(
        policy.decide(DisconnectReason::BuildFailed),
        ReconnectDecision::Reconnect(Duration::from_secs(10))
    );
    assert_eq!(policy.conflicts(), 0);
}

#[test]
fn test_should_ignore() {
    let none: Vec<String> = Vec::new();
    assert!(should_ignore(true, false, true, "1", &none));
    assert!(should_ignore(false, true, true, "1", &none));
    assert!(!should_ignore(false, true, false, "1", &none));
    assert!(!should_ignore(false, false, true, "1", &none));

    let allowed = vec!["923001234567".to_string()];
    assert!(!should_ignore(false, false, true, "923001234567", &allowed));
    assert!(should_ignore(false, false, true, "15550001111", &allowed));
}

#[test]
fn test_unwrap_ephemeral_and_extract_text() {
    let wrapped = Message {
        ephemeral_message: Some(
            FutureProofMessage {
                message: Some(Box::new(text_msg("  hi there "))),
                ..Default::default()
            }
            .into(),
        ),
        ..Default::default()
    };
    assert_eq!(message_text(unwrap_message(&wrapped)), "hi there");
}

#[test]
fn test_message_text_from_caption() {
    let msg = Message {
        image_message: Some(Box::new(ImageMessage {
            caption: Some("look at this".into()),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert_eq!(message_text(&msg), "look at this");
    assert_eq!(message_text(&Message::default()), "");
}

#[test]
fn test_describe_quoted_variants() {
    assert_eq!(describe_quoted(&text_msg("earlier")).as_deref(), Some("earlier"));

    let img = Message {
        image_message: Some(Box::new(ImageMessage::default())),
        ..Default::default()
    };
    assert_eq!(describe_quoted(&img).as_deref(), Some("[An Image]"));

    let vid = Message {
        video_message: Some(Box::new(VideoMessage::default())),
        ..Default::default()
    };
    assert_eq!(describe_quoted(&vid).as_deref(), Some("[A Video]"));

    let voice = Message {
        audio_message: Some(Box::new(AudioMessage::default())),
        ..Default::default()
    };
    assert_eq!(describe_quoted(&voice).as_deref(), Some("[A Voice Note]"));
    assert_eq!(describe_quoted(&Message::default()), None);
}

#[test]
fn test_quoted_text_from_reply() {
    let reply = Message {
        extended_text_message: Some(
            ExtendedTextMessage {
                text: Some("what about this?".into()),
                context_info: Some(
                    ContextInfo {
                        quoted_message: Some(Box::new(text_msg("the original"))),
                        ..Default::default()
                    }
                    .into(),
                ),
                ..Default::default()
            }
            .into(),
        ),
        ..Default::default()
    };
    assert_eq!(quoted_text(&reply).as_deref(), Some("the original"));
    assert_eq!(quoted_text(&text_msg("plain")), None);
}

#[test]
fn test_image_mime_sniffing() {
    assert_eq!(image_mime(&[0x89, b'P', b'N', b'G', 0, 0]), "image/png");
    assert_eq!(image_mime(b"GIF89a..."), "image/gif");
    assert_eq!(image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
    assert_eq!(image_mime(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
}

#[tokio::test]
async fn test_new_channel_is_disconnected() {
    let tmp = tempfile::tempdir().unwrap();
    let channel = WhatsAppChannel::new(WhatsAppConfig::default(), tmp.path());
    assert!(!channel.is_connected().await);
    assert!(channel.latest_qr().await.is_none());
    assert_eq!(channel.qr_image_path(), tmp.path().join("login-qr.png"));
    assert!(channel.session_db_path().ends_with("whatsapp_session/whatsapp.db"));
    assert!(tmp.path().join("whatsapp_session").is_dir());
}

#[test]
fn test_presence_mapping() {
    assert_eq!(presence_status(false), PresenceStatus::Available);
    assert_eq!(presence_status(true), PresenceStatus::Offline);
    assert_eq!(
        chat_presence_status(ChatPresence::Composing),
        PresenceStatus::Composing
    );
    assert_eq!(
        chat_presence_status(ChatPresence::Paused),
        PresenceStatus::Available
    );
}

#[test]
fn test_sticker_is_forwarded_protocol_is_not() {
    let sticker = Message {
        sticker_message: Some(Box::new(StickerMessage::default())),
        ..Default::default()
    };
    assert!(is_user_content(&sticker));
    assert!(is_user_content(&text_msg("hi")));
    assert!(!is_user_content(&Message::default()));

    let revoke = Message {
        protocol_message: Some(Box::new(ProtocolMessage::default())),
        ..Default::default()
    };
    assert!(!is_user_content(&revoke));
}

#[test]
fn test_media_attachments_keep_kind_without_bytes() {
    let msg = Message {
        image_message: Some(Box::new(ImageMessage {
            mimetype: Some("image/png".into()),
            ..Default::default()
        })),
        ..Default::default()
    };
    let parts = media_attachments(&msg);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].file_type, AttachmentType::Image);
    assert_eq!(parts[0].mime_type.as_deref(), Some("image/png"));
    assert!(parts[0].data.is_none());

    let gif = Message {
        video_message: Some(Box::new(VideoMessage {
            gif_playback: Some(true),
            ..Default::default()
        })),
        ..Default::default()
    };
    assert!(media_attachments(&gif)[0].gif_playback);
    assert!(media_attachments(&text_msg("plain")).is_empty());
}

#[tokio::test]
async fn test_clear_qr_image_removes_file() {
    let tmp = tempfile::tempdir().unwrap();
    let channel = WhatsAppChannel::new(WhatsAppConfig::default(), tmp.path());
    std::fs::write(channel.qr_image_path(), b"png").unwrap();
    channel.clear_qr_image().await;
    assert!(!channel.qr_image_path().exists());
    // Missing file is fine.
    channel.clear_qr_image().await;
}
