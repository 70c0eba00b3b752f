use super::chart::{ ChartView, TerminalChartRenderer };
use super::{ render, Rendering };
use crate::conversation::{ ConversationState, SUGGESTIONS };
use crate::models::chat::{ Message, Role };
use crossterm::style::Stylize;
use std::io::{ self, Write };

/// Prints conversation messages to a terminal stream.
pub struct TerminalView<W: Write> {
    out: W,
    charts: ChartView<TerminalChartRenderer>,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, chart_width: usize) -> Self {
        Self {
            out,
            charts: ChartView::new(TerminalChartRenderer::new(chart_width)),
        }
    }

    pub fn show_message(&mut self, message: &Message) -> io::Result<()> {
        match message.role {
            Role::User => write!(self.out, "{} ", "you ›".cyan().bold())?,
            Role::Agent => write!(self.out, "{} ", "agent ›".green().bold())?,
        }

        match render(&message.content) {
            Rendering::Formatted(lines) => {
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        writeln!(self.out)?;
                    }
                    for span in &line.spans {
                        if span.is_emphasis() {
                            write!(self.out, "{}", span.text().bold())?;
                        } else {
                            write!(self.out, "{}", span.text())?;
                        }
                    }
                }
                writeln!(self.out)?;
            }
            Rendering::Error(text) => {
                writeln!(self.out, "{}", text.red())?;
            }
            Rendering::Chart(spec) => {
                let mount = self.charts.update(spec);
                writeln!(self.out)?;
                match &mount.error {
                    Some(error) => writeln!(self.out, "{}", error.as_str().red().italic())?,
                    None => {
                        for line in &mount.lines {
                            writeln!(self.out, "  {}", line)?;
                        }
                    }
                }
            }
        }
        self.out.flush()
    }

    pub fn show_conversation(&mut self, state: &ConversationState) -> io::Result<()> {
        for message in state.messages() {
            self.show_message(message)?;
        }
        if state.is_first_visit() {
            self.show_suggestions()?;
        }
        Ok(())
    }

    pub fn show_suggestions(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "Try asking:".dim())?;
        for suggestion in SUGGESTIONS {
            writeln!(self.out, "  {} {}", "•".dim(), suggestion)?;
        }
        self.out.flush()
    }

    pub fn status(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text.dim())?;
        self.out.flush()
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "{} ", "›".bold())?;
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}
