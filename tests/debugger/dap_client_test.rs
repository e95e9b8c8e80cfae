use base64::Engine;
use pixcat::debugger::client::{encode_message, read_message};
use pixcat::{resolve_image, DapClient, VariableRef};
use serde_json::{json, Value};
use tokio::io::{duplex, split, AsyncWrite, AsyncWriteExt, BufReader};

use crate::test_helpers::image_config;

async fn reply<W: AsyncWrite + Unpin>(writer: &mut W, request: &Value, body: Value) {
    let response = json!({
        "seq": 0,
        "type": "response",
        "request_seq": request["seq"],
        "success": true,
        "command": request["command"],
        "body": body,
    });
    let bytes = serde_json::to_vec(&response).unwrap();
    writer.write_all(&encode_message(&bytes)).await.unwrap();
    writer.flush().await.unwrap();
}

/// Full resolution against a fake adapter speaking the wire protocol
#[tokio::test]
async fn test_resolve_over_the_wire() {
    let (client_side, adapter_side) = duplex(64 * 1024);
    let (client_read, client_write) = split(client_side);
    let (adapter_read, mut adapter_write) = split(adapter_side);

    let adapter = tokio::spawn(async move {
        let mut reader = BufReader::new(adapter_read);
        let mut commands = Vec::new();
        loop {
            let request: Value = match read_message(&mut reader).await {
                Ok(body) => serde_json::from_slice(&body).unwrap(),
                Err(_) => break,
            };
            let command = request["command"].as_str().unwrap().to_string();
            let args = &request["arguments"];
            let body = match command.as_str() {
                "threads" => json!({"threads": [{"id": 5, "name": "worker"}]}),
                "stackTrace" => json!({"stackFrames": [{"id": 77, "name": "blur", "line": 3, "column": 1}]}),
                "evaluate" => match args["expression"].as_str().unwrap() {
                    "img" => json!({"result": "{...}", "type": "Image", "variablesReference": 1}),
                    "img.data" => json!({"result": "0x4000", "type": "uchar *", "memoryReference": "0x4000", "variablesReference": 0}),
                    "img.w" | "img.h" => json!({"result": "2", "type": "int", "variablesReference": 0}),
                    "img.bpp" => json!({"result": "16", "type": "int", "variablesReference": 0}),
                    other => panic!("unexpected expression {}", other),
                },
                "readMemory" => {
                    assert_eq!(args["memoryReference"], "0x4000");
                    assert_eq!(args["count"], 8);
                    let data = base64::engine::general_purpose::STANDARD.encode([1u8, 0, 2, 0, 3, 0, 4, 0]);
                    json!({"address": "0x4000", "data": data})
                }
                other => panic!("unexpected command {}", other),
            };
            reply(&mut adapter_write, &request, body).await;
            commands.push(command);
        }
        commands
    });

    let client = DapClient::new(client_read, client_write);
    let (descriptor, pixels) = resolve_image(&client, &VariableRef::new("img"), &image_config())
        .await
        .unwrap();
    drop(client);

    assert_eq!((descriptor.width, descriptor.height, descriptor.bits_per_pixel), (2, 2, 16));
    assert_eq!(pixels, vec![1, 0, 2, 0, 3, 0, 4, 0]);

    let commands = adapter.await.unwrap();
    assert_eq!(
        commands,
        vec![
            "threads", "stackTrace", "stackTrace", "evaluate", "evaluate", "evaluate", "evaluate",
            "evaluate", "readMemory"
        ]
    );
}
