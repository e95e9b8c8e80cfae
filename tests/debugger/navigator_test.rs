use pixcat::debugger::navigator::{resolve_image, SessionNavigator};
use pixcat::{build_field_expression, VariableRef, ViewerConfig, ViewerError};

use crate::test_helpers::{image_config, image_session, Call, ScriptedTransport};

#[test]
fn test_field_expression_forms() {
    assert_eq!(build_field_expression("img", ".", "&data"), "&(img.data)");
    assert_eq!(build_field_expression("img", "->", "width"), "img->width");
    assert_eq!(build_field_expression("img", ".", "a&b"), "img.a&b");
}

#[tokio::test]
async fn test_resolves_image_and_pixels() {
    let session = image_session(4, 2);
    let (descriptor, pixels) = resolve_image(&session, &VariableRef::new("img"), &image_config())
        .await
        .unwrap();

    assert_eq!(descriptor.width, 4);
    assert_eq!(descriptor.height, 2);
    assert_eq!(descriptor.bits_per_pixel, 8);
    assert_eq!(descriptor.data_pointer_expression, "img.data");
    assert_eq!(pixels, (0..8).collect::<Vec<u8>>());

    assert_eq!(
        session.calls(),
        vec![
            Call::Threads,
            Call::StackTrace { thread_id: 1, levels: Some(1) },
            Call::StackTrace { thread_id: 1, levels: None },
            Call::Evaluate("img".to_string()),
            Call::Evaluate("img.data".to_string()),
            Call::Evaluate("img.w".to_string()),
            Call::Evaluate("img.h".to_string()),
            Call::Evaluate("img.bpp".to_string()),
            Call::ReadMemory { reference: "0x7f0000001000".to_string(), count: 8 },
        ]
    );
}

#[tokio::test]
async fn test_active_thread_is_first_with_frames() {
    // Threads A (no frames), B (2 frames), C (1 frame)
    let session = ScriptedTransport::new()
        .with_thread(10, 0)
        .with_thread(20, 2)
        .with_thread(30, 1);

    let context = SessionNavigator::new(&session).evaluation_context().await.unwrap();
    assert_eq!(context.thread_id, 20);
    assert_eq!(context.frame_id, 20_000);
    assert!(!session
        .calls()
        .contains(&Call::StackTrace { thread_id: 30, levels: Some(1) }));
}

#[tokio::test]
async fn test_default_width_skips_evaluation() {
    let session = image_session(4, 2);
    let config = ViewerConfig {
        width_name: String::new(),
        default_width: 4,
        ..image_config()
    };

    let (descriptor, _) = resolve_image(&session, &VariableRef::new("img"), &config)
        .await
        .unwrap();
    assert_eq!(descriptor.width, 4);
    assert!(!session.evaluated().iter().any(|expr| expr == "img.w"));
}

#[tokio::test]
async fn test_all_defaults_for_headerless_buffer() {
    let session = ScriptedTransport::new()
        .with_thread(1, 1)
        .with_value("frame", "{...}", "Image *")
        .with_pointer("&(frame->pixels)", "0x2000")
        .with_memory("0x2000", vec![9; 3 * 2 * 2]);
    let config = ViewerConfig {
        data_ptr_name: "&pixels".to_string(),
        width_name: String::new(),
        height_name: String::new(),
        bits_per_pixel_name: String::new(),
        default_width: 3,
        default_height: 2,
        default_bits_per_pixel: 16,
        ..image_config()
    };

    let (descriptor, pixels) = resolve_image(&session, &VariableRef::new("frame"), &config)
        .await
        .unwrap();
    assert_eq!((descriptor.width, descriptor.height, descriptor.bits_per_pixel), (3, 2, 16));
    assert_eq!(descriptor.data_pointer_expression, "&(frame->pixels)");
    assert_eq!(pixels.len(), 12);
    assert_eq!(session.evaluated(), vec!["frame", "&(frame->pixels)"]);
}

#[tokio::test]
async fn test_unknown_type_issues_no_further_requests() {
    let session = image_session(4, 2).with_value("other", "{...}", "cv::Mat");

    let result = resolve_image(&session, &VariableRef::new("other"), &image_config()).await;
    assert!(matches!(result, Err(ViewerError::UnknownType(t)) if t == "cv::Mat"));
    assert_eq!(session.evaluated(), vec!["other"]);
    assert_eq!(session.memory_reads(), 0);
}

#[tokio::test]
async fn test_non_numeric_field() {
    let session = image_session(4, 2).with_value("img.h", "<error: not available>", "int");

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    match result {
        Err(ViewerError::FieldNotNumeric { field, raw }) => {
            assert_eq!(field, "h");
            assert_eq!(raw, "<error: not available>");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(session.memory_reads(), 0);
}

#[tokio::test]
async fn test_invalid_memory_reference() {
    let session = image_session(4, 2).with_pointer("img.data", "<not an address>");

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    assert!(matches!(result, Err(ViewerError::InvalidMemoryReference(_))));
}

#[tokio::test]
async fn test_pointer_without_memory_reference() {
    let session = image_session(4, 2).with_value("img.data", "0x0", "unsigned char *");

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    assert!(matches!(result, Err(ViewerError::NoMemoryReference(_))));
}

#[tokio::test]
async fn test_bad_bit_depth_stops_before_read() {
    let session = image_session(4, 2).with_value("img.bpp", "12", "int");

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    assert!(matches!(result, Err(ViewerError::InvalidBitDepth(12))));
    assert_eq!(session.memory_reads(), 0);
}

#[tokio::test]
async fn test_short_memory_read() {
    let session = image_session(4, 2).with_memory("0x7f0000001000", vec![0; 5]);

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    assert!(matches!(result, Err(ViewerError::MemoryReadFailed(_))));
}

#[tokio::test]
async fn test_unreadable_memory_is_a_read_failure() {
    let session = image_session(4, 2).with_pointer("img.data", "0x10");

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    assert!(matches!(result, Err(ViewerError::MemoryReadFailed(_))));
}

#[tokio::test]
async fn test_width_out_of_range() {
    let session = image_session(4, 2).with_value("img.w", "0x100000000", "size_t");

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    assert!(matches!(
        result,
        Err(ViewerError::FieldOutOfRange { field, value }) if field == "w" && value == 1 << 32
    ));
}

#[tokio::test]
async fn test_size_overflow_is_rejected_before_reading() {
    // 2^31 * 2^31 * 32 bits is 2^64 bytes
    let session = image_session(4, 2)
        .with_value("img.w", "2147483648", "int")
        .with_value("img.h", "2147483648", "int")
        .with_value("img.bpp", "32", "int");

    let result = resolve_image(&session, &VariableRef::new("img"), &image_config()).await;
    assert!(matches!(
        result,
        Err(ViewerError::ImageTooLarge { width: 2147483648, height: 2147483648, bits_per_pixel: 32, .. })
    ));
    assert_eq!(session.memory_reads(), 0);
}

#[tokio::test]
async fn test_evaluate_failure_is_a_transport_error() {
    let session = image_session(4, 2);

    let result = resolve_image(&session, &VariableRef::new("missing"), &image_config()).await;
    assert!(matches!(result, Err(ViewerError::Transport(_))));
}

#[tokio::test]
async fn test_malformed_type_map() {
    let session = image_session(4, 2);
    let config = ViewerConfig {
        image_class_name: "{'Image': ".to_string(),
        ..image_config()
    };

    let result = resolve_image(&session, &VariableRef::new("img"), &config).await;
    assert!(matches!(result, Err(ViewerError::InvalidTypeMap(_))));
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn test_context_recomputed_per_call() {
    let session = image_session(2, 2);
    let navigator = SessionNavigator::new(&session);

    navigator.resolve_image(&VariableRef::new("img"), &image_config()).await.unwrap();
    navigator.resolve_image(&VariableRef::new("img"), &image_config()).await.unwrap();

    let thread_requests = session
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::Threads))
        .count();
    assert_eq!(thread_requests, 2);
}
