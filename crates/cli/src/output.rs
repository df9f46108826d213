use crate::error::CliError;
use async_trait::async_trait;
use engine_processing::{
    converter::{Output, OutputSink},
    error::SinkError,
};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

/// Writes each output as one JSON document per line.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl JsonLinesSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputSink for JsonLinesSink<W> {
    async fn emit(&mut self, output: Output) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&output)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

pub fn print_report<T: Serialize>(report: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_processing::converter::ConvertedRecord;
    use model::core::value::Value;

    #[tokio::test]
    async fn test_writes_one_line_per_output() {
        let mut sink = JsonLinesSink::new(Vec::new());
        for ordinal in 0..2 {
            let record = ConvertedRecord {
                ordinal,
                parent_ordinal: None,
                fields: vec![("id".to_string(), Value::Int(ordinal + 1))],
            };
            sink.emit(Output::Record(record)).await.unwrap();
        }

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "{\"ordinal\":0,\"fields\":{\"id\":1}}\n{\"ordinal\":1,\"fields\":{\"id\":2}}\n"
        );
    }
}
