use super::postprocess::{clean_reply, identity_answer};
use super::*;
use sable_core::config::PersonaConfig;

fn persona() -> PersonaConfig {
    PersonaConfig {
        name: "Sable".into(),
        owner_name: "Mazhar".into(),
        ..Default::default()
    }
}

#[test]
fn test_plain_reply_has_no_directives() {
    let parsed = parse_reply("Hey, kya haal hai?");
    assert_eq!(parsed.text, "Hey, kya haal hai?");
    assert!(parsed.directives.is_empty());
}

#[test]
fn test_tokens_are_case_insensitive_and_stripped() {
    let parsed = parse_reply("[reaction: 😂] haha that's good [gif: laugh]");
    assert_eq!(parsed.text, "haha that's good");
    assert_eq!(
        parsed.directives,
        vec![Directive::Gif("laugh".into()), Directive::Reaction("😂".into())]
    );
}

#[test]
fn test_directives_sorted_by_priority() {
    let parsed = parse_reply(
        "[FALLBACK] [SONG_SEARCH: tum hi ho] [WEB_SEARCH: rust] [GLOBAL_MEMORY_RESET] [DEEP_RESEARCH: mars]",
    );
    let priorities: Vec<u8> = parsed.directives.iter().map(Directive::priority).collect();
    assert_eq!(priorities, vec![0, 1, 6, 11, 13]);
    assert!(parsed.text.is_empty());
}

#[test]
fn test_first_occurrence_wins_but_all_are_stripped() {
    let parsed = parse_reply("a [WEB_SEARCH: first] b [WEB_SEARCH: second] c");
    assert_eq!(parsed.directives, vec![Directive::WebSearch("first".into())]);
    assert!(!parsed.text.contains("WEB_SEARCH"));
    assert!(parsed.text.starts_with('a') && parsed.text.ends_with('c'));
}

#[test]
fn test_owner_image_alias() {
    assert_eq!(parse_reply("[OWNER_IMAGE]").directives, vec![Directive::OwnerPhoto]);
    assert_eq!(
        parse_reply("[TRIGGER_SEND_REAL_OWNER_PHOTO]").directives,
        vec![Directive::OwnerPhoto]
    );
}

#[test]
fn test_forward_and_lead_arguments() {
    let parsed = parse_reply("done [FORWARD: 0300-1234567 | call me back] [NEW_LEAD: Ali, shop app]");
    assert_eq!(
        parsed.directives,
        vec![
            Directive::Forward {
                phone: "0300-1234567".into(),
                message: "call me back".into()
            },
            Directive::NewLead {
                name: "Ali".into(),
                project: "shop app".into()
            },
        ]
    );
    assert_eq!(parsed.text, "done");
}

#[test]
fn test_malformed_tokens_are_stripped_without_directive() {
    let parsed = parse_reply("ok [FORWARD: nobody] [NEW_LEAD: just a name] [GIF:]");
    assert!(parsed.directives.is_empty());
    assert_eq!(parsed.text, "ok");
}

#[test]
fn test_unknown_brackets_survive() {
    let parsed = parse_reply("see [note] and [USER_REPLY_TO: x]");
    assert_eq!(parsed.text, "see [note] and [USER_REPLY_TO: x]");
    assert!(parsed.directives.is_empty());
}

#[test]
fn test_image_search_count() {
    let count_of = |s: &str| match parse_reply(s).directives.first() {
        Some(Directive::ImageSearch { query, count }) => (query.clone(), *count),
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(count_of("[IMG_SEARCH: red cars, 3]"), ("red cars".into(), 3));
    assert_eq!(count_of("[IMG_SEARCH: cats]"), ("cats".into(), 1));
    assert_eq!(count_of("[IMG_SEARCH: cats, count]"), ("cats".into(), 1));
    assert_eq!(count_of("[IMG_SEARCH: dogs, 40]"), ("dogs".into(), MAX_IMAGE_COUNT));
    assert_eq!(count_of("[IMG_SEARCH: dogs, 0]"), ("dogs".into(), 1));
    assert_eq!(
        count_of("[IMG_SEARCH: paris, france]"),
        ("paris, france".into(), 1)
    );
}

#[test]
fn test_terminal_kinds() {
    assert!(Directive::Fallback.is_terminal());
    assert!(Directive::Gif("x".into()).is_terminal());
    assert!(!Directive::MemoryReset.is_terminal());
    assert!(!Directive::SongSearch("x".into()).is_terminal());
}

#[test]
fn test_forward_jid_normalization() {
    assert_eq!(
        forward_jid("0300-1234567").as_deref(),
        Some("923001234567@s.whatsapp.net")
    );
    assert_eq!(
        forward_jid("+92 300 1234567").as_deref(),
        Some("923001234567@s.whatsapp.net")
    );
    assert_eq!(forward_jid("no digits"), None);
}

#[test]
fn test_strip_tokens_collapses_blank_lines() {
    assert_eq!(strip_tokens("one\n\n[FALLBACK]\n\ntwo"), "one\n\ntwo");
}

#[test]
fn test_clean_reply_removes_echo() {
    let out = clean_reply(
        "Tell me about Lahore: Sable: Lahore is the heart of Punjab.",
        "tell me about lahore",
        &persona(),
    );
    assert_eq!(out, "Lahore is the heart of Punjab.");
}

#[test]
fn test_clean_reply_ignores_short_prompts() {
    assert_eq!(clean_reply("hi there, hi!", "hi", &persona()), "hi there, hi!");
}

#[test]
fn test_identity_shield() {
    let out = clean_reply(
        "I'm an AI language model, not a person.",
        "sach batao, are you real?",
        &persona(),
    );
    assert_eq!(out, identity_answer(&persona()));

    let echoed = clean_reply(
        "Are you real or an AI bot? Of course, just me.",
        "Are you real or an AI bot?",
        &persona(),
    );
    assert_eq!(echoed, identity_answer(&persona()));

    let untouched = clean_reply("Haan bilkul, real hoon yaar!", "are you real?", &persona());
    assert_eq!(untouched, "Haan bilkul, real hoon yaar!");
}

#[test]
fn test_filler_removal() {
    let out = clean_reply(
        "Thinking... as an ai model, I love chai.",
        "chai ya coffee?",
        &persona(),
    );
    assert_eq!(out, "Yaar, I love chai.");
    assert_eq!(clean_reply("sable HERE bolo", "kaun ho tum", &persona()), "bolo");
}
