//! WS-Management SOAP envelopes for the Windows remote shell.
//!
//! Only the handful of messages a single command needs are built here, and
//! responses are read with targeted patterns rather than a full XML parser.

use std::sync::LazyLock;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use uuid::Uuid;

const NS_SOAP: &str = "http://www.w3.org/2003/05/soap-envelope";
const NS_ADDRESSING: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
const NS_WSMAN: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";
const NS_SHELL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell";
const ANONYMOUS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

pub const RESOURCE_CMD: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/cmd";

pub const ACTION_CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
pub const ACTION_DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
pub const ACTION_COMMAND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command";
pub const ACTION_RECEIVE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive";
pub const ACTION_SIGNAL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal";

const SIGNAL_TERMINATE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";

/// Command state reported once the process has exited.
pub const STATE_DONE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/CommandState/Done";

/// WS-Management fault code for a Receive that saw no output in time.
const TIMED_OUT_CODE: &str = "2150858793";

const MAX_ENVELOPE_SIZE: u32 = 153_600;

/// UTF-8 code page so output decodes without a codec table.
const CODEPAGE_UTF8: u32 = 65001;

static SHELL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:\w+:)?Selector Name="ShellId">([^<]+)</(?:\w+:)?Selector>|<(?:\w+:)?ShellId>([^<]+)</(?:\w+:)?ShellId>"#)
        .expect("static regex")
});

static COMMAND_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:\w+:)?CommandId>([^<]+)</(?:\w+:)?CommandId>").expect("static regex")
});

static STREAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:\w+:)?Stream\s[^>]*?Name="(\w+)"[^>]*?(?:/>|>([^<]*)</(?:\w+:)?Stream>)"#)
        .expect("static regex")
});

static COMMAND_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:\w+:)?CommandState\s[^>]*?State="([^"]+)""#).expect("static regex")
});

static EXIT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:\w+:)?ExitCode>(-?\d+)</(?:\w+:)?ExitCode>").expect("static regex")
});

static FAULT_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:\w+:)?(?:Text|Message)[^>]*>(.*?)</(?:\w+:)?(?:Text|Message)>")
        .expect("static regex")
});

/// Escape text for use inside an element or attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Header fields shared by every request.
#[derive(Debug, Clone)]
pub struct Header<'a> {
    pub to: &'a str,
    pub action: &'a str,
    pub operation_timeout: Duration,
    pub shell_id: Option<&'a str>,
    pub options: &'a [(&'a str, String)],
}

/// A complete SOAP envelope with a fresh message id.
pub fn envelope(header: &Header<'_>, body: &str) -> String {
    let selector = header
        .shell_id
        .map(|id| {
            format!(
                r#"<wsman:SelectorSet><wsman:Selector Name="ShellId">{}</wsman:Selector></wsman:SelectorSet>"#,
                escape(id)
            )
        })
        .unwrap_or_default();

    let options = if header.options.is_empty() {
        String::new()
    } else {
        let items: String = header
            .options
            .iter()
            .map(|(name, value)| {
                format!(r#"<wsman:Option Name="{name}">{}</wsman:Option>"#, escape(value))
            })
            .collect();
        format!("<wsman:OptionSet>{items}</wsman:OptionSet>")
    };

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<s:Envelope xmlns:s="{ns_soap}" xmlns:wsa="{ns_wsa}" xmlns:wsman="{ns_wsman}" xmlns:rsp="{ns_shell}">"#,
            "<s:Header>",
            "<wsa:To>{to}</wsa:To>",
            r#"<wsman:ResourceURI s:mustUnderstand="true">{resource}</wsman:ResourceURI>"#,
            r#"<wsa:ReplyTo><wsa:Address s:mustUnderstand="true">{anonymous}</wsa:Address></wsa:ReplyTo>"#,
            r#"<wsa:Action s:mustUnderstand="true">{action}</wsa:Action>"#,
            r#"<wsman:MaxEnvelopeSize s:mustUnderstand="true">{max_size}</wsman:MaxEnvelopeSize>"#,
            "<wsa:MessageID>uuid:{message_id}</wsa:MessageID>",
            r#"<wsman:Locale xml:lang="en-US" s:mustUnderstand="false"/>"#,
            "<wsman:OperationTimeout>PT{timeout}S</wsman:OperationTimeout>",
            "{selector}{options}",
            "</s:Header>",
            "<s:Body>{body}</s:Body>",
            "</s:Envelope>"
        ),
        ns_soap = NS_SOAP,
        ns_wsa = NS_ADDRESSING,
        ns_wsman = NS_WSMAN,
        ns_shell = NS_SHELL,
        to = escape(header.to),
        resource = RESOURCE_CMD,
        anonymous = ANONYMOUS,
        action = header.action,
        max_size = MAX_ENVELOPE_SIZE,
        message_id = Uuid::new_v4().to_string().to_uppercase(),
        timeout = header.operation_timeout.as_secs(),
        selector = selector,
        options = options,
        body = body,
    )
}

/// Options sent with shell creation.
pub fn create_options() -> Vec<(&'static str, String)> {
    vec![
        ("WINRS_NOPROFILE", "FALSE".to_string()),
        ("WINRS_CODEPAGE", CODEPAGE_UTF8.to_string()),
    ]
}

pub fn create_body() -> &'static str {
    "<rsp:Shell><rsp:InputStreams>stdin</rsp:InputStreams><rsp:OutputStreams>stdout stderr</rsp:OutputStreams></rsp:Shell>"
}

/// Options sent with each command.
pub fn command_options() -> Vec<(&'static str, String)> {
    vec![
        ("WINRS_CONSOLEMODE_STDIN", "TRUE".to_string()),
        ("WINRS_SKIP_CMD_SHELL", "FALSE".to_string()),
    ]
}

pub fn command_body(command: &str, args: &[String]) -> String {
    let args: String = args
        .iter()
        .map(|arg| format!("<rsp:Arguments>{}</rsp:Arguments>", escape(arg)))
        .collect();
    format!(
        "<rsp:CommandLine><rsp:Command>{}</rsp:Command>{args}</rsp:CommandLine>",
        escape(command)
    )
}

pub fn receive_body(command_id: &str) -> String {
    format!(
        r#"<rsp:Receive><rsp:DesiredStream CommandId="{}">stdout stderr</rsp:DesiredStream></rsp:Receive>"#,
        escape(command_id)
    )
}

pub fn signal_body(command_id: &str) -> String {
    format!(
        r#"<rsp:Signal CommandId="{}"><rsp:Code>{SIGNAL_TERMINATE}</rsp:Code></rsp:Signal>"#,
        escape(command_id)
    )
}

pub fn shell_id(response: &str) -> Option<String> {
    SHELL_ID.captures(response).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_string())
    })
}

pub fn command_id(response: &str) -> Option<String> {
    COMMAND_ID
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
}

/// Output decoded from one Receive response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceiveChunk {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub done: bool,
    pub exit_code: Option<i64>,
}

/// Decode the streams and command state from a Receive response.
pub fn parse_receive(response: &str) -> Result<ReceiveChunk, base64::DecodeError> {
    let mut chunk = ReceiveChunk::default();

    for caps in STREAM.captures_iter(response) {
        let Some(content) = caps.get(2).map(|m| m.as_str().trim()) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        let decoded = STANDARD.decode(content)?;
        match &caps[1] {
            "stdout" => chunk.stdout.extend(decoded),
            "stderr" => chunk.stderr.extend(decoded),
            _ => {}
        }
    }

    chunk.done = COMMAND_STATE
        .captures(response)
        .is_some_and(|caps| &caps[1] == STATE_DONE);
    chunk.exit_code = EXIT_CODE
        .captures(response)
        .and_then(|caps| caps[1].parse().ok());

    Ok(chunk)
}

/// Whether a fault only reports that a Receive long-poll expired.
pub fn is_operation_timeout(fault: &str) -> bool {
    fault.contains(TIMED_OUT_CODE) || fault.contains("w:TimedOut")
}

/// Human-readable text of a SOAP fault, if present.
pub fn fault_message(response: &str) -> Option<String> {
    FAULT_TEXT
        .captures(response)
        .map(|caps| caps[1].trim().to_string())
        .filter(|text| !text.is_empty())
}
