//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use emberkv::protocol::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, Command, CommandType, Response, Status,
    MAX_PAYLOAD_SIZE,
};
use emberkv::EmberError;

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_get() {
    let cmd = Command::Get {
        key: b"hello".to_vec(),
    };
    let encoded = encode_command(&cmd);
    let decoded = decode_command(&encoded).unwrap();

    assert_eq!(decoded, cmd);
}

#[test]
fn test_encode_decode_set() {
    let cmd = Command::Set {
        key: b"mykey".to_vec(),
        value: b"myvalue".to_vec(),
    };
    let encoded = encode_command(&cmd);

    match decode_command(&encoded).unwrap() {
        Command::Set { key, value } => {
            assert_eq!(key, b"mykey");
            assert_eq!(value, b"myvalue");
        }
        other => panic!("Expected SET command, got {:?}", other),
    }
}

#[test]
fn test_encode_decode_remove() {
    let cmd = Command::Remove {
        key: b"todelete".to_vec(),
    };
    let encoded = encode_command(&cmd);

    assert_eq!(decode_command(&encoded).unwrap(), cmd);
    assert_eq!(cmd.command_type(), CommandType::Remove);
}

#[test]
fn test_encode_decode_empty_key_and_value() {
    let cmd = Command::Set {
        key: vec![],
        value: vec![],
    };
    let encoded = encode_command(&cmd);

    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

#[test]
fn test_encode_decode_binary_data() {
    // Binary data containing null bytes and high bytes
    let binary_key: Vec<u8> = vec![0x00, 0x01, 0xFF, 0xFE, 0x80];
    let binary_value: Vec<u8> = (0..=255).collect();

    let cmd = Command::Set {
        key: binary_key,
        value: binary_value,
    };
    let encoded = encode_command(&cmd);

    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_response_get_ok() {
    let resp = Response::ok(CommandType::Get, Some(b"value".to_vec()));
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded, resp);
    assert!(decoded.is_ok());
}

#[test]
fn test_get_ok_with_empty_value_keeps_value() {
    let resp = Response::ok(CommandType::Get, Some(Vec::new()));
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded.value, Some(Vec::new()));
}

#[test]
fn test_encode_decode_response_set_ok() {
    let resp = Response::ok(CommandType::Set, None);
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert_eq!(decoded.kind, CommandType::Set);
    assert_eq!(decoded.value, None);
}

#[test]
fn test_encode_decode_response_not_found() {
    let resp = Response::not_found(CommandType::Remove);
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded.status, Status::NotFound);
    assert_eq!(decoded.kind, CommandType::Remove);
    assert_eq!(decoded.value, None);
    assert_eq!(decoded.error, "Key not found");
}

#[test]
fn test_encode_decode_response_error() {
    let resp = Response::error(CommandType::Get, "something went wrong");
    let decoded = decode_response(&encode_response(&resp)).unwrap();

    assert_eq!(decoded.status, Status::Error);
    assert_eq!(decoded.error, "something went wrong");
    assert_eq!(decoded.value, None);
}

#[test]
fn test_response_from_engine_results() {
    let ok = Response::from_result(CommandType::Get, Ok(Some(b"v".to_vec())));
    assert_eq!(ok, Response::ok(CommandType::Get, Some(b"v".to_vec())));

    let missing = Response::from_result(CommandType::Get, Err(EmberError::KeyNotFound));
    assert_eq!(missing.status, Status::NotFound);

    let failed = Response::from_result(
        CommandType::Set,
        Err(EmberError::Protocol("bad".to_string())),
    );
    assert_eq!(failed.status, Status::Error);
    assert_eq!(failed.error, "Protocol error: bad");
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let bytes = [0x01, 0x00, 0x00]; // Only 3 bytes, need 5
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete header"));
}

#[test]
fn test_incomplete_payload() {
    // Header says 10 bytes payload, but only 5 provided
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x05, 0x68];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete"));
}

#[test]
fn test_unknown_command_type() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown command type"));
}

#[test]
fn test_unknown_response_status() {
    let bytes = [0xFF, 0x01, 0x00, 0x00, 0x00, 0x00];
    let result = decode_response(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown response status"));
}

#[test]
fn test_get_missing_key_length() {
    // GET command with payload too short for key length
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00];
    assert!(matches!(decode_command(&bytes), Err(EmberError::Protocol(_))));
}

#[test]
fn test_key_length_beyond_payload() {
    // key_len claims 9 bytes, only 2 follow
    let bytes = [0x03, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x09, b'a', b'b'];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("incomplete key"));
}

#[test]
fn test_get_with_trailing_bytes() {
    let mut bytes = encode_command(&Command::Get { key: b"k".to_vec() });
    bytes.push(0xAA);
    bytes[4] += 1; // grow the declared payload to cover the extra byte

    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("trailing"));
}

#[test]
fn test_set_ok_with_payload_rejected() {
    // OK SET must not carry a payload
    let bytes = [0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x7A];
    assert!(matches!(decode_response(&bytes), Err(EmberError::Protocol(_))));
}

#[test]
fn test_oversized_payload_rejected_before_reading() {
    let len = MAX_PAYLOAD_SIZE + 1;
    let mut bytes = vec![0x02];
    bytes.extend_from_slice(&len.to_be_bytes());

    let mut cursor = Cursor::new(bytes);
    let result = read_command(&mut cursor);
    assert!(result.unwrap_err().to_string().contains("Payload too large"));
}

#[test]
fn test_read_from_empty_stream_is_eof() {
    let mut cursor = Cursor::new(Vec::new());
    match read_command(&mut cursor) {
        Err(EmberError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF, got {:?}", other),
    }
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_write_read_command() {
    let cmd = Command::Set {
        key: b"key".to_vec(),
        value: b"value".to_vec(),
    };

    let mut buffer = Vec::new();
    write_command(&mut buffer, &cmd).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_command(&mut cursor).unwrap(), cmd);
}

#[test]
fn test_stream_write_read_response() {
    let resp = Response::ok(CommandType::Get, Some(b"result".to_vec()));

    let mut buffer = Vec::new();
    write_response(&mut buffer, &resp).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_response(&mut cursor).unwrap(), resp);
}

#[test]
fn test_stream_multiple_commands() {
    let commands = vec![
        Command::Set {
            key: b"k1".to_vec(),
            value: b"v1".to_vec(),
        },
        Command::Get { key: b"k1".to_vec() },
        Command::Remove { key: b"k1".to_vec() },
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_multiple_responses() {
    let responses = vec![
        Response::ok(CommandType::Get, Some(b"data".to_vec())),
        Response::not_found(CommandType::Get),
        Response::error(CommandType::Set, "oops"),
        Response::ok(CommandType::Remove, None),
    ];

    let mut buffer = Vec::new();
    for resp in &responses {
        write_response(&mut buffer, resp).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &responses {
        assert_eq!(&read_response(&mut cursor).unwrap(), expected);
    }
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_get() {
    let cmd = Command::Get {
        key: b"test".to_vec(),
    };
    let encoded = encode_command(&cmd);

    // Expected: [0x01][0x00 0x00 0x00 0x08][0x00 0x00 0x00 0x04][t e s t]
    //           kind  payload_len(8)       key_len(4)          key
    assert_eq!(encoded[0], 0x01);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x08]);
    assert_eq!(&encoded[5..9], &[0x00, 0x00, 0x00, 0x04]);
    assert_eq!(&encoded[9..13], b"test");
}

#[test]
fn test_wire_format_set() {
    let cmd = Command::Set {
        key: b"k".to_vec(),
        value: b"vv".to_vec(),
    };
    let encoded = encode_command(&cmd);

    assert_eq!(
        encoded,
        vec![0x02, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x01, b'k', b'v', b'v']
    );
}

#[test]
fn test_wire_format_response_ok() {
    let resp = Response::ok(CommandType::Get, Some(b"hi".to_vec()));
    let encoded = encode_response(&resp);

    // Expected: [0x00][0x01][0x00 0x00 0x00 0x02][h i]
    //           status kind  payload_len(2)      payload
    assert_eq!(encoded[0], 0x00);
    assert_eq!(encoded[1], 0x01);
    assert_eq!(&encoded[2..6], &[0x00, 0x00, 0x00, 0x02]);
    assert_eq!(&encoded[6..8], b"hi");
}

#[test]
fn test_wire_format_response_not_found() {
    let encoded = encode_response(&Response::not_found(CommandType::Remove));

    assert_eq!(encoded[0], 0x01);
    assert_eq!(encoded[1], 0x03);
    assert_eq!(&encoded[6..], b"Key not found");
}
