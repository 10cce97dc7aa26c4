//! Quote subscriber demo.
//!
//! Dials the publisher demo over TCP and prints every decoded quote until
//! the stream closes.

mod common;

use common::{DemoConfig, market_data_templates};
use fastwire::prelude::*;
use tracing::info;

fn main() -> Result<()> {
    common::init_tracing();
    let config = DemoConfig::from_env();

    let mut conn = TcpEndpoint::new(config.addr()).connect()?;
    info!(addr = %config.addr(), "subscribed");

    let mut input = MessageInputStream::new(
        Context::new(market_data_templates()),
        ReaderAdapter(&mut conn),
    );
    input.set_template_handler(1, |message: &mut Message, _: &mut Context| {
        let (mantissa, exponent) = message.get_decimal("BidPx").unwrap_or((0, 0));
        info!(
            symbol = message.get_str("Symbol").unwrap_or("?"),
            bid = format_args!("{mantissa}e{exponent}"),
            "quote"
        );
    });

    let mut count = 0usize;
    while let Some(msg) = input.read_message()? {
        count += 1;
        info!(%msg, "received");
    }

    info!(count, "stream closed");
    conn.close()?;
    Ok(())
}

/// Borrows a connection's read half as an owned `Read` for the stream.
struct ReaderAdapter<'a>(&'a mut Box<dyn Connection>);

impl std::io::Read for ReaderAdapter<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.reader().read(buf)
    }
}
