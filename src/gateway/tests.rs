use super::directives::{FALLBACK_NOTICE, OFFLINE_NOTICE};
use super::pipeline::{build_turn, quoted_prefix, GIF_PROMPT, IMAGE_PROMPT};
use super::*;
use async_trait::async_trait;
use sable_core::{
    config::{MediaConfig, Prompts},
    context::Context,
    error::SableError,
    message::{Attachment, AttachmentType, MessageMetadata, PresenceStatus, PresenceUpdate},
    traits::{Provider, Transcriber},
};
use sable_memory::ConversationStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

const SENDER: &str = "923331112222@s.whatsapp.net";
const OWNER: &str = "923001234567@s.whatsapp.net";

/// Replies from a script, then "ok". Tracks how many calls overlap.
#[derive(Default)]
struct ScriptedProvider {
    replies: StdMutex<VecDeque<String>>,
    seen: StdMutex<Vec<Context>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    fn with(replies: &[&str]) -> Self {
        Self {
            replies: StdMutex::new(replies.iter().map(|r| r.to_string()).collect()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, SableError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.seen.lock().unwrap().push(context.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string());
        Ok(OutgoingMessage {
            text,
            metadata: MessageMetadata::default(),
            reply_target: None,
        })
    }

    async fn is_available(&self) -> bool {
        true
    }
}

struct FixedTranscriber;

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8], _filename: &str) -> Result<String, SableError> {
        Ok("bhai kya scene hai".into())
    }
}

/// Records everything the gateway sends.
#[derive(Default)]
struct RecordingChannel {
    texts: StdMutex<Vec<(String, String)>>,
    media: StdMutex<Vec<(String, &'static str)>>,
    reactions: StdMutex<Vec<(String, String)>>,
    events: StdMutex<Option<mpsc::Receiver<ChannelEvent>>>,
}

impl RecordingChannel {
    fn texts(&self) -> Vec<(String, String)> {
        self.texts.lock().unwrap().clone()
    }

    fn texts_to(&self, target: &str) -> Vec<String> {
        self.texts()
            .into_iter()
            .filter(|(t, _)| t == target)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn start(&self) -> Result<mpsc::Receiver<ChannelEvent>, SableError> {
        self.events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SableError::Channel("already started".into()))
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), SableError> {
        let target = message.reply_target.unwrap_or_default();
        self.texts.lock().unwrap().push((target, message.text));
        Ok(())
    }

    async fn send_media(&self, target: &str, media: OutboundMedia) -> Result<(), SableError> {
        self.media.lock().unwrap().push((target.to_string(), media.kind()));
        Ok(())
    }

    async fn send_reaction(
        &self,
        _target: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), SableError> {
        self.reactions
            .lock()
            .unwrap()
            .push((message_id.to_string(), emoji.to_string()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), SableError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

struct Harness {
    _tmp: tempfile::TempDir,
    gw: Arc<Gateway>,
    channel: Arc<RecordingChannel>,
    provider: Arc<ScriptedProvider>,
}

fn harness(replies: &[&str]) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let data_dir = tmp.path().to_path_buf();
    let mut config = Config::default();
    config.persona.owner_jid = OWNER.into();
    config.api.enabled = false;

    let provider = Arc::new(ScriptedProvider::with(replies));
    let ai = AiService::new(
        provider.clone(),
        Arc::new(FixedTranscriber),
        ConversationStore::new(data_dir.join("history"), 12),
        Prompts::default(),
        config.persona.clone(),
        true,
    );
    let channel = Arc::new(RecordingChannel::default());
    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
    channels.insert("whatsapp".into(), channel.clone());
    let media = MediaClient::from_config(&MediaConfig::default()).unwrap();

    Harness {
        gw: Arc::new(Gateway::new(&config, data_dir, ai, channels, media)),
        _tmp: tmp,
        channel,
        provider,
    }
}

fn message(sender: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        id: uuid::Uuid::new_v4(),
        channel: "whatsapp".into(),
        sender_id: sender.into(),
        sender_name: Some("Ali".into()),
        text: text.into(),
        timestamp: chrono::Utc::now(),
        attachments: Vec::new(),
        reply_target: Some(sender.into()),
        is_group: false,
        platform_id: Some("3EB0ABCDEF".into()),
        quoted_text: None,
    }
}

fn attachment(file_type: AttachmentType, data: &[u8]) -> Attachment {
    Attachment {
        file_type,
        data: Some(data.to_vec()),
        filename: None,
        mime_type: None,
        gif_playback: false,
    }
}

#[test]
fn test_quoted_prefix() {
    assert_eq!(quoted_prefix(None), "");
    assert_eq!(quoted_prefix(Some("  ")), "");
    assert_eq!(
        quoted_prefix(Some("kal milte hain")),
        "[USER_REPLY_TO: \"kal milte hain\"] "
    );
}

#[test]
fn test_build_turn_defaults_for_media() {
    let mut msg = message(SENDER, "");
    msg.attachments.push(attachment(AttachmentType::Image, b"jpeg"));
    let turn = build_turn(&msg);
    assert_eq!(turn.prompt, IMAGE_PROMPT);
    let image = turn.image.unwrap();
    assert_eq!(image.mime_type, "image/jpeg");
    assert_eq!(image.base64, "anBlZw==");

    let mut gif = message(SENDER, "");
    let mut video = attachment(AttachmentType::Video, b"mp4");
    video.gif_playback = true;
    gif.attachments.push(video);
    assert_eq!(build_turn(&gif).prompt, GIF_PROMPT);

    let mut captioned = message(SENDER, "dekho yeh");
    captioned.quoted_text = Some("[An Image]".into());
    assert_eq!(
        build_turn(&captioned).prompt,
        "[USER_REPLY_TO: \"[An Image]\"] dekho yeh"
    );
}

#[tokio::test]
async fn test_image_without_bytes_still_gets_image_prompt() {
    let h = harness(&[]);
    let mut msg = message(SENDER, "");
    msg.attachments.push(Attachment {
        data: None,
        ..attachment(AttachmentType::Image, b"")
    });
    h.gw.handle_message(msg).await;

    let seen = h.provider.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].current_message, IMAGE_PROMPT);
    assert!(seen[0].image.is_none());
    assert!(!h.gw.data_dir.join("media").exists());
}

#[tokio::test]
async fn test_command_skips_model() {
    let h = harness(&[]);
    h.gw.handle_message(message(SENDER, "joke")).await;

    let sent = h.channel.texts_to(SENDER);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("😂 *Dev Joke*"));
    assert!(h.provider.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_owner_command_from_stranger_reaches_model() {
    let h = harness(&["nahi yaar"]);
    h.gw.handle_message(message(SENDER, "leads")).await;
    assert_eq!(h.channel.texts_to(SENDER), vec!["nahi yaar".to_string()]);

    h.gw.handle_message(message(OWNER, "leads")).await;
    assert!(h.channel.texts_to(OWNER)[0].contains("koi leads nahi"));
}

#[tokio::test]
async fn test_reply_with_reaction() {
    let h = harness(&["Zabardast! [REACTION: 🔥]"]);
    h.gw.handle_message(message(SENDER, "naya laptop liya")).await;

    assert_eq!(h.channel.texts_to(SENDER), vec!["Zabardast!".to_string()]);
    assert_eq!(
        h.channel.reactions.lock().unwrap().clone(),
        vec![("3EB0ABCDEF".to_string(), "🔥".to_string())]
    );
}

#[tokio::test]
async fn test_forward_directive() {
    let h = harness(&["Bhej diya. [FORWARD: 0300-1234567 | Meeting at 5]"]);
    h.gw.handle_message(message(SENDER, "owner ko bolo meeting hai"))
        .await;

    assert_eq!(h.channel.texts_to(OWNER), vec!["Meeting at 5".to_string()]);
    assert_eq!(h.channel.texts_to(SENDER), vec!["Bhej diya.".to_string()]);
}

#[tokio::test]
async fn test_fallback_is_terminal() {
    let h = harness(&["[FALLBACK] [REACTION: 👍] something"]);
    h.gw.handle_message(message(SENDER, "asdfgh")).await;

    assert_eq!(h.channel.texts_to(SENDER), vec![FALLBACK_NOTICE.to_string()]);
    // Reaction ranks before fallback and still runs.
    assert_eq!(h.channel.reactions.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_offline_notice_depends_on_prompt() {
    let h = harness(&[
        "Abhi busy hain [TRIGGER_NOTIFY_OWNER_OFFLINE]",
        "Sab theek [TRIGGER_NOTIFY_OWNER_OFFLINE]",
    ]);
    h.gw.handle_message(message(SENDER, "owner se baat karao"))
        .await;
    h.gw.handle_message(message(SENDER, "kya haal hai")).await;

    assert_eq!(
        h.channel.texts_to(SENDER),
        vec![OFFLINE_NOTICE.to_string(), "Sab theek".to_string()]
    );
}

#[tokio::test]
async fn test_new_lead_updates_profile() {
    let h = harness(&["Great, baat karte hain! [NEW_LEAD: Ali, shop app]"]);
    h.gw.handle_message(message(SENDER, "mujhe app banwani hai"))
        .await;

    let leads = h.gw.leads.all().await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].project, "shop app");

    let profile = h.gw.profiles.get_or_create(SENDER, "Ali").await.unwrap();
    assert_eq!(profile.relationship, "Lead");
    assert_eq!(profile.notes, "Interested in: shop app");
    assert_eq!(
        h.channel.texts_to(SENDER),
        vec!["Great, baat karte hain!".to_string()]
    );
}

#[tokio::test]
async fn test_memory_reset_clears_transcript() {
    let h = harness(&["pehla jawab", "Chalo fresh start. [GLOBAL_MEMORY_RESET]"]);
    h.gw.handle_message(message(SENDER, "yaad rakhna")).await;
    assert_eq!(h.gw.ai.history(SENDER).await.len(), 2);

    h.gw.handle_message(message(SENDER, "sab bhool jao")).await;
    assert!(h.gw.ai.history(SENDER).await.is_empty());
    assert_eq!(h.channel.texts_to(SENDER)[1], "Chalo fresh start.");
}

#[tokio::test]
async fn test_image_is_saved_counted_and_sent_to_model() {
    let h = harness(&["Kya photo hai!"]);
    let mut msg = message(SENDER, "");
    msg.attachments.push(attachment(AttachmentType::Image, b"jpeg-bytes"));
    h.gw.handle_message(msg).await;

    let saved: Vec<_> = std::fs::read_dir(h.gw.data_dir.join("media"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].extension().unwrap(), "jpg");
    assert_eq!(std::fs::read(&saved[0]).unwrap(), b"jpeg-bytes");

    assert_eq!(h.gw.stats.media_stats(SENDER).await.images, 1);
    assert!(h.channel.media.lock().unwrap().is_empty());

    let seen = h.provider.seen.lock().unwrap();
    assert_eq!(seen[0].current_message, IMAGE_PROMPT);
    assert!(seen[0].image.is_some());
}

#[tokio::test]
async fn test_voice_note_is_transcribed() {
    let h = harness(&["Sab set hai"]);
    let mut msg = message(SENDER, "");
    msg.attachments.push(attachment(AttachmentType::Audio, b"ogg"));
    h.gw.handle_message(msg).await;

    let seen = h.provider.seen.lock().unwrap();
    assert_eq!(seen[0].current_message, "bhai kya scene hai");
}

#[tokio::test]
async fn test_empty_message_greets_persona() {
    let h = harness(&["Haan bolo"]);
    h.gw.handle_message(message(SENDER, "   ")).await;
    let seen = h.provider.seen.lock().unwrap();
    assert_eq!(seen[0].current_message, "Hi Sable!");
}

#[tokio::test]
async fn test_dispatch_serializes_per_sender() {
    let h = harness(&["jawab ek", "jawab do"]);
    let first = h.gw.clone().dispatch_message(message(SENDER, "pehla sawal"));
    let second = h.gw.clone().dispatch_message(message(SENDER, "doosra sawal"));
    tokio::join!(first, second);

    assert_eq!(h.provider.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.channel.texts_to(SENDER),
        vec!["jawab ek".to_string(), "jawab do".to_string()]
    );
    let order: Vec<_> = h
        .provider
        .seen
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.current_message.clone())
        .collect();
    assert_eq!(order, vec!["pehla sawal", "doosra sawal"]);
    assert!(h.gw.active_senders.lock().await.is_empty());
}

#[tokio::test]
async fn test_audit_log_records_both_directions() {
    let h = harness(&["theek hai"]);
    h.gw.handle_message(message(SENDER, "joke")).await;
    let log = std::fs::read_to_string(h.gw.data_dir.join("logs").join("messages.log")).unwrap();
    assert_eq!(log.lines().count(), 2);
    assert!(log.contains("joke"));
}

#[tokio::test]
async fn test_run_tracks_presence_and_stops_on_fatal() {
    let h = harness(&[]);
    let (tx, rx) = mpsc::channel(8);
    *h.channel.events.lock().unwrap() = Some(rx);

    tx.send(ChannelEvent::Presence(PresenceUpdate {
        channel: "whatsapp".into(),
        jid: "923009998888@s.whatsapp.net".into(),
        status: PresenceStatus::Composing,
    }))
    .await
    .unwrap();
    tx.send(ChannelEvent::Fatal("logged out".into())).await.unwrap();

    let err = h.gw.clone().run().await.unwrap_err();
    assert_eq!(err.to_string(), "logged out");
    assert_eq!(
        h.gw.stats.presences().await,
        vec![(
            "923009998888@s.whatsapp.net".to_string(),
            PresenceStatus::Composing
        )]
    );
}

#[tokio::test]
async fn test_shutdown_command_stops_run_loop() {
    let h = harness(&[]);
    let (tx, rx) = mpsc::channel(8);
    *h.channel.events.lock().unwrap() = Some(rx);
    tx.send(ChannelEvent::Message(message(OWNER, "nuke")))
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), h.gw.clone().run()).await;
    assert!(result.unwrap().is_ok());
    drop(tx);
}
