//! Tests for `notify::email::EmailNotifier` against a scripted SMTP stub.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use exabgp_notify::config::SmtpSettings;
use exabgp_notify::event::Notification;
use exabgp_notify::notify::email::EmailNotifier;
use exabgp_notify::notify::{Delivery, Notifier, NotifyError};

fn notification() -> Notification {
    Notification {
        subject: "ExaBGP: route REMOVED 10.0.0.0/24 (nh 10.0.0.1)".to_owned(),
        html: "<b>ExaBGP</b>: route <b>REMOVED</b>".to_owned(),
        plain: "ExaBGP: route REMOVED\nPrefix: 10.0.0.0/24".to_owned(),
    }
}

fn settings(port: u16, to: &[&str]) -> SmtpSettings {
    SmtpSettings {
        host: "127.0.0.1".to_owned(),
        port,
        user: String::new(),
        password: String::new(),
        from: "bgp@example.net".to_owned(),
        to: to.iter().map(|s| (*s).to_owned()).collect(),
        ssl: false,
        starttls: true,
    }
}

/// Plain SMTP server without STARTTLS that refuses any recipient whose
/// address contains `gone`. Returns the port and the session transcript.
async fn smtp_stub() -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let port = listener.local_addr().expect("local addr").port();

    let handle = tokio::spawn(async move {
        let (sock, _) = listener.accept().await.expect("accept");
        let (read, mut write) = sock.into_split();
        let mut reader = BufReader::new(read);
        let mut transcript = Vec::new();

        write
            .write_all(b"220 stub ESMTP\r\n")
            .await
            .expect("greeting");

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.expect("read command") == 0 {
                break;
            }
            let command = line.trim_end().to_owned();
            transcript.push(command.clone());
            let verb = command.get(..4).unwrap_or("").to_ascii_uppercase();

            let reply: &[u8] = match verb.as_str() {
                "EHLO" | "HELO" => b"250 stub\r\n",
                "MAIL" => b"250 2.1.0 OK\r\n",
                "RCPT" if command.contains("gone") => b"550 5.1.1 mailbox unavailable\r\n",
                "RCPT" => b"250 2.1.5 OK\r\n",
                "DATA" => {
                    write
                        .write_all(b"354 end with <CRLF>.<CRLF>\r\n")
                        .await
                        .expect("data reply");
                    loop {
                        let mut body = String::new();
                        if reader.read_line(&mut body).await.expect("read body") == 0 {
                            break;
                        }
                        if body == ".\r\n" {
                            break;
                        }
                        transcript.push(format!("> {}", body.trim_end()));
                    }
                    b"250 2.0.0 queued\r\n"
                }
                "QUIT" => {
                    write.write_all(b"221 bye\r\n").await.ok();
                    break;
                }
                "RSET" | "NOOP" => b"250 OK\r\n",
                _ => b"502 not implemented\r\n",
            };
            write.write_all(reply).await.expect("reply");
        }
        transcript
    });

    (port, handle)
}

#[tokio::test]
async fn delivers_to_accepted_recipients_and_reports_refused_ones() {
    let (port, server) = smtp_stub().await;
    let notifier = EmailNotifier::new(settings(
        port,
        &["noc@example.net", "gone@example.net", "oncall@example.net"],
    ));

    let delivery = notifier.send(&notification()).await.expect("send succeeds");
    let transcript = server.await.expect("stub task");

    let Delivery::Partial { refused } = delivery else {
        panic!("expected partial delivery, got {delivery:?}");
    };
    assert_eq!(refused.len(), 1);
    assert_eq!(refused[0].0, "gone@example.net");
    assert!(!refused[0].1.is_empty());

    assert!(transcript.iter().any(|l| l == "MAIL FROM:<bgp@example.net>"));
    assert!(transcript.iter().any(|l| l == "RCPT TO:<noc@example.net>"));
    assert!(transcript.iter().any(|l| l == "RCPT TO:<oncall@example.net>"));
    assert!(transcript.iter().any(|l| l == "DATA"));
    assert!(transcript
        .iter()
        .any(|l| l == "> Subject: ExaBGP: route REMOVED 10.0.0.0/24 (nh 10.0.0.1)"));
    assert!(transcript.iter().any(|l| l == "> Prefix: 10.0.0.0/24"));
    assert!(!transcript.iter().any(|l| l.starts_with("STARTTLS")));
}

#[tokio::test]
async fn all_accepted_is_complete() {
    let (port, server) = smtp_stub().await;
    let notifier = EmailNotifier::new(settings(port, &["noc@example.net"]));

    let delivery = notifier.send(&notification()).await.expect("send succeeds");
    server.await.expect("stub task");

    assert_eq!(delivery, Delivery::Complete);
}

#[tokio::test]
async fn all_refused_sends_no_data() {
    let (port, server) = smtp_stub().await;
    let notifier = EmailNotifier::new(settings(
        port,
        &["gone@example.net", "gone.too@example.net"],
    ));

    let err = notifier
        .send(&notification())
        .await
        .expect_err("send should fail");
    let transcript = server.await.expect("stub task");

    match err {
        NotifyError::AllRecipientsRefused(addrs) => {
            assert_eq!(addrs, vec!["gone@example.net", "gone.too@example.net"]);
        }
        other => panic!("expected AllRecipientsRefused, got {other:?}"),
    }
    assert!(!transcript.iter().any(|l| l == "DATA"));
}

#[tokio::test]
async fn invalid_recipients_are_skipped_before_connecting() {
    let (port, server) = smtp_stub().await;
    let notifier = EmailNotifier::new(settings(port, &["not an address", "noc@example.net"]));

    let delivery = notifier.send(&notification()).await.expect("send succeeds");
    let transcript = server.await.expect("stub task");

    assert_eq!(delivery, Delivery::Complete);
    let rcpts: Vec<&String> = transcript
        .iter()
        .filter(|l| l.starts_with("RCPT"))
        .collect();
    assert_eq!(rcpts, vec!["RCPT TO:<noc@example.net>"]);
}

#[tokio::test]
async fn no_valid_recipient_fails_without_connecting() {
    let notifier = EmailNotifier::new(settings(1, &["nope"]));
    let err = notifier
        .send(&notification())
        .await
        .expect_err("send should fail");
    assert!(matches!(err, NotifyError::NoRecipients));
}
