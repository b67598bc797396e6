/*!
 * Tests for provider selection and credential resolution
 */

use std::collections::HashMap;
use subtrans::errors::ProviderError;
use subtrans::providers::{
    create_provider, detect_provider_from_key, select_provider, Credentials, ProviderKind, ProviderOptions,
    ProviderSelection,
};

fn lookup_from(pairs: &[(&str, &str)]) -> Credentials {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Credentials::from_lookup(|var| vars.get(var).cloned())
}

fn with_provider(kind: ProviderKind) -> ProviderOptions {
    ProviderOptions {
        provider: Some(kind),
        ..ProviderOptions::default()
    }
}

#[test]
fn test_detect_provider_from_key_withKnownPrefixes_shouldMapToProvider() {
    assert_eq!(detect_provider_from_key("sk-ant-api03-abc"), ProviderKind::Anthropic);
    assert_eq!(detect_provider_from_key("sk-kimi-123"), ProviderKind::Kimi);
    assert_eq!(detect_provider_from_key("AIzaSyExample"), ProviderKind::Gemini);
    assert_eq!(detect_provider_from_key("sk-proj-abc"), ProviderKind::OpenAI);
    assert_eq!(detect_provider_from_key("sk-abc"), ProviderKind::OpenAI);
    assert_eq!(detect_provider_from_key("something-else"), ProviderKind::OpenAI);
}

#[test]
fn test_credentials_from_lookup_withBlankValue_shouldTreatItAsAbsent() {
    let credentials = lookup_from(&[("OPENAI_API_KEY", "   "), ("GEMINI_API_KEY", " AIza-key ")]);

    assert_eq!(credentials.get(ProviderKind::OpenAI), None);
    assert_eq!(credentials.get(ProviderKind::Gemini), Some("AIza-key"));
    assert!(!credentials.is_empty());
}

#[test]
fn test_credentials_first_available_withSeveralKeys_shouldFollowScanOrder() {
    let credentials = Credentials::new()
        .with_key(ProviderKind::Kimi, "kimi-key")
        .with_key(ProviderKind::Anthropic, "ant-key");

    assert_eq!(credentials.first_available(), Some((ProviderKind::Anthropic, "ant-key")));
}

#[test]
fn test_select_provider_withExplicitProviderAndKey_shouldUseBoth() {
    let options = ProviderOptions {
        api_key: Some("explicit".to_string()),
        ..with_provider(ProviderKind::Gemini)
    };
    let credentials = Credentials::new().with_key(ProviderKind::Gemini, "from-env");

    let selection = select_provider(&options, &credentials).unwrap();

    assert_eq!(
        selection,
        ProviderSelection {
            kind: ProviderKind::Gemini,
            api_key: Some("explicit".to_string()),
        }
    );
}

#[test]
fn test_select_provider_withExplicitProviderOnly_shouldReadItsCredential() {
    let credentials = Credentials::new()
        .with_key(ProviderKind::OpenAI, "openai-key")
        .with_key(ProviderKind::Anthropic, "ant-key");

    let selection = select_provider(&with_provider(ProviderKind::Anthropic), &credentials).unwrap();

    assert_eq!(selection.kind, ProviderKind::Anthropic);
    assert_eq!(selection.api_key.as_deref(), Some("ant-key"));
}

#[test]
fn test_select_provider_withExplicitProviderMissingKey_shouldNameVariable() {
    let result = select_provider(&with_provider(ProviderKind::Kimi), &Credentials::new());

    match result {
        Err(ProviderError::MissingApiKey { provider, env_var }) => {
            assert_eq!(provider, "Kimi");
            assert_eq!(env_var, "KIMI_API_KEY");
        }
        other => panic!("expected MissingApiKey, got {:?}", other),
    }
}

#[test]
fn test_select_provider_withKeyOnly_shouldDetectFromPrefix() {
    let options = ProviderOptions {
        api_key: Some("sk-ant-xyz".to_string()),
        ..ProviderOptions::default()
    };
    // The explicit key wins over environment credentials
    let credentials = Credentials::new().with_key(ProviderKind::OpenAI, "sk-openai");

    let selection = select_provider(&options, &credentials).unwrap();

    assert_eq!(selection.kind, ProviderKind::Anthropic);
    assert_eq!(selection.api_key.as_deref(), Some("sk-ant-xyz"));
}

#[test]
fn test_select_provider_withOnlyEnvironmentKeys_shouldPickFirstInOrder() {
    let credentials = lookup_from(&[("KIMI_API_KEY", "k"), ("GEMINI_API_KEY", "g")]);

    let selection = select_provider(&ProviderOptions::default(), &credentials).unwrap();

    assert_eq!(selection.kind, ProviderKind::Gemini);
    assert_eq!(selection.api_key.as_deref(), Some("g"));
}

#[test]
fn test_select_provider_withNothingConfigured_shouldFallBackToWhisper() {
    let selection = select_provider(&ProviderOptions::default(), &Credentials::new()).unwrap();

    assert_eq!(selection.kind, ProviderKind::Whisper);
    assert_eq!(selection.api_key, None);
}

#[test]
fn test_select_provider_withBlankExplicitKey_shouldIgnoreIt() {
    let options = ProviderOptions {
        api_key: Some("  ".to_string()),
        ..ProviderOptions::default()
    };

    let selection = select_provider(&options, &Credentials::new()).unwrap();

    assert_eq!(selection.kind, ProviderKind::Whisper);
}

#[test]
fn test_create_provider_withEachRemoteKind_shouldBuildMatchingProvider() {
    let credentials = Credentials::new()
        .with_key(ProviderKind::OpenAI, "o")
        .with_key(ProviderKind::Anthropic, "a")
        .with_key(ProviderKind::Gemini, "g")
        .with_key(ProviderKind::Kimi, "k");

    for kind in ProviderKind::REMOTE {
        let provider = create_provider(&with_provider(kind), &credentials).unwrap();
        assert_eq!(provider.kind(), kind);
        assert_eq!(provider.model(), kind.default_model());
    }
}

#[test]
fn test_create_provider_withModelOverride_shouldUseIt() {
    let options = ProviderOptions {
        model: Some("gpt-4.1".to_string()),
        ..with_provider(ProviderKind::OpenAI)
    };
    let credentials = Credentials::new().with_key(ProviderKind::OpenAI, "o");

    let provider = create_provider(&options, &credentials).unwrap();

    assert_eq!(provider.model(), "gpt-4.1");
}

#[test]
fn test_create_provider_withWhisperAndFrenchTarget_shouldFail() {
    let result = create_provider(&with_provider(ProviderKind::Whisper), &Credentials::new());
    assert!(matches!(result, Err(ProviderError::UnsupportedOperation(_))));
}

#[test]
fn test_create_provider_withWhisperAndEnglishTarget_shouldBuildLocalProvider() {
    let options = ProviderOptions {
        source_language: "fr".to_string(),
        target_language: "en".to_string(),
        ..with_provider(ProviderKind::Whisper)
    };

    let provider = create_provider(&options, &Credentials::new()).unwrap();

    assert_eq!(provider.kind(), ProviderKind::Whisper);
    assert_eq!(provider.model(), "small");
}
