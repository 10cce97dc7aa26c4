//! Quote publisher demo.
//!
//! Accepts one TCP subscriber and streams a short quote sequence, then the
//! close sentinel. Run the subscriber demo in another terminal first.

mod common;

use common::{DemoConfig, market_data_templates};
use fastwire::prelude::*;
use tracing::info;

fn main() -> Result<()> {
    common::init_tracing();
    let config = DemoConfig::from_env();

    let acceptor = TcpAcceptor::bind(config.addr())?;
    info!(addr = %config.addr(), "waiting for a subscriber");
    let mut conn = acceptor.accept()?;

    let mut out = MessageOutputStream::new(
        Context::new(market_data_templates()),
        WriterAdapter(&mut conn),
    );

    let quotes = [
        ("ACI", 101_25i64, 101_50i64, 300u32, 200u32),
        ("ACI", 101_30, 101_55, 250, 225),
        ("ACI", 101_30, 101_60, 250, 150),
    ];

    for (symbol, bid, ask, bid_qty, ask_qty) in quotes {
        let template = out.context().template(1).expect("registered template");
        let mut msg = Message::new(template);
        msg.set("Symbol", symbol)?;
        msg.set(
            "BidPx",
            FieldValue::Decimal {
                mantissa: bid,
                exponent: -2,
            },
        )?;
        msg.set(
            "AskPx",
            FieldValue::Decimal {
                mantissa: ask,
                exponent: -2,
            },
        )?;
        msg.set("BidQty", bid_qty)?;
        msg.set("AskQty", ask_qty)?;

        info!(%msg, "publishing");
        out.write_message(&mut msg, true)?;
    }

    out.close();
    conn.close()?;
    info!("done");
    Ok(())
}

/// Borrows a connection's write half as an owned `Write` for the stream.
struct WriterAdapter<'a>(&'a mut Box<dyn Connection>);

impl std::io::Write for WriterAdapter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.writer().flush()
    }
}
