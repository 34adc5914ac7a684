//! Shared fixtures for unit and scenario tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::document::{Document, parse};
use crate::mutation::EditOperation;
use crate::orchestrator::{OracleError, OracleReply, OracleRequest, ReasoningOracle};

/// A small XLSForm workbook: fields, choice lists and settings.
pub(crate) const SAMPLE_FORM: &str = r#"<?xml version="1.0"?>
<?mso-application progid="Excel.Sheet"?>
<Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet"
 xmlns:o="urn:schemas-microsoft-com:office:office"
 xmlns:x="urn:schemas-microsoft-com:office:excel"
 xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet"
 xmlns:html="http://www.w3.org/TR/REC-html40">
 <DocumentProperties xmlns="urn:schemas-microsoft-com:office:office">
  <Author>Field Team</Author>
 </DocumentProperties>
 <Styles>
  <Style ss:ID="Default" ss:Name="Normal">
   <Alignment ss:Vertical="Bottom"/>
  </Style>
  <Style ss:ID="s62">
   <Font ss:Bold="1"/>
  </Style>
 </Styles>
 <Worksheet ss:Name="survey">
  <Table ss:ExpandedColumnCount="5" ss:ExpandedRowCount="5" x:FullColumns="1" x:FullRows="1">
   <Column ss:Width="120"/>
   <Row>
    <Cell ss:StyleID="s62"><Data ss:Type="String">type</Data></Cell>
    <Cell ss:StyleID="s62"><Data ss:Type="String">name</Data></Cell>
    <Cell ss:StyleID="s62"><Data ss:Type="String">label</Data></Cell>
    <Cell ss:StyleID="s62"><Data ss:Type="String">relevant</Data></Cell>
    <Cell ss:StyleID="s62"><Data ss:Type="String">required</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">integer</Data></Cell>
    <Cell><Data ss:Type="String">age</Data></Cell>
    <Cell><Data ss:Type="String">How old are you?</Data></Cell>
    <Cell ss:Index="5"><Data ss:Type="Boolean">1</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">select_one yes_no</Data></Cell>
    <Cell><Data ss:Type="String">consent</Data></Cell>
    <Cell><Data ss:Type="String">Do you consent?</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">text</Data></Cell>
    <Cell><Data ss:Type="String">reason</Data></Cell>
    <Cell><Data ss:Type="String">Why &amp; how?</Data></Cell>
    <Cell><Data ss:Type="String">${consent} = 'no' and ${age} &gt; 17</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">select_multiple equipment</Data></Cell>
    <Cell><Data ss:Type="String">equipment_used</Data></Cell>
    <Cell><Data ss:Type="String">Equipment</Data></Cell>
   </Row>
  </Table>
  <WorksheetOptions xmlns="urn:schemas-microsoft-com:office:excel">
   <Panes>
    <Pane>
     <Number>3</Number>
    </Pane>
   </Panes>
  </WorksheetOptions>
 </Worksheet>
 <Worksheet ss:Name="choices">
  <Table ss:ExpandedColumnCount="3" ss:ExpandedRowCount="5" x:FullColumns="1" x:FullRows="1">
   <Row>
    <Cell><Data ss:Type="String">list_name</Data></Cell>
    <Cell><Data ss:Type="String">name</Data></Cell>
    <Cell><Data ss:Type="String">label</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">yes_no</Data></Cell>
    <Cell><Data ss:Type="String">yes</Data></Cell>
    <Cell><Data ss:Type="String">Yes</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">yes_no</Data></Cell>
    <Cell><Data ss:Type="String">no</Data></Cell>
    <Cell><Data ss:Type="String">No</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">equipment</Data></Cell>
    <Cell><Data ss:Type="String">pump</Data></Cell>
    <Cell><Data ss:Type="String">Pump</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">equipment</Data></Cell>
    <Cell><Data ss:Type="String">meter</Data></Cell>
    <Cell><Data ss:Type="String">Meter</Data></Cell>
   </Row>
  </Table>
 </Worksheet>
 <Worksheet ss:Name="settings">
  <Table ss:ExpandedColumnCount="2" ss:ExpandedRowCount="2">
   <Row>
    <Cell><Data ss:Type="String">form_title</Data></Cell>
    <Cell><Data ss:Type="String">form_id</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">Household Survey</Data></Cell>
    <Cell><Data ss:Type="String">household_v1</Data></Cell>
   </Row>
  </Table>
 </Worksheet>
</Workbook>
"#;

/// A form whose two fields are named alike.
pub(crate) const SIMILAR_FIELDS_FORM: &str = r#"<?xml version="1.0"?>
<Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet"
 xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet">
 <Worksheet ss:Name="survey">
  <Table>
   <Row>
    <Cell><Data ss:Type="String">type</Data></Cell>
    <Cell><Data ss:Type="String">name</Data></Cell>
    <Cell><Data ss:Type="String">label</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">text</Data></Cell>
    <Cell><Data ss:Type="String">name_first</Data></Cell>
    <Cell><Data ss:Type="String">First name</Data></Cell>
   </Row>
   <Row>
    <Cell><Data ss:Type="String">text</Data></Cell>
    <Cell><Data ss:Type="String">name_last</Data></Cell>
    <Cell><Data ss:Type="String">Last name</Data></Cell>
   </Row>
  </Table>
 </Worksheet>
</Workbook>
"#;

pub(crate) fn sample_document() -> Document {
    parse(SAMPLE_FORM).expect("sample form parses")
}

pub(crate) fn similar_fields_document() -> Document {
    parse(SIMILAR_FIELDS_FORM).expect("similar fields form parses")
}

/// Replays a fixed list of replies, then gives up.
pub(crate) struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<OracleReply, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new(replies: impl IntoIterator<Item = Result<OracleReply, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn proposing(ops: impl IntoIterator<Item = EditOperation>) -> Self {
        Self::new(ops.into_iter().map(|operation| {
            Ok(OracleReply::Propose {
                operation,
                rationale: None,
            })
        }))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }
}

impl ReasoningOracle for ScriptedOracle {
    async fn propose_next(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        self.requests.lock().push(request.clone());
        self.replies.lock().pop_front().unwrap_or(Ok(OracleReply::CannotProceed {
            reason: "script exhausted".to_string(),
        }))
    }
}

/// Proposes the same operation forever.
pub(crate) struct RepeatingOracle {
    operation: EditOperation,
    calls: AtomicUsize,
}

impl RepeatingOracle {
    pub fn new(operation: EditOperation) -> Self {
        Self {
            operation,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReasoningOracle for RepeatingOracle {
    async fn propose_next(&self, _request: &OracleRequest) -> Result<OracleReply, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OracleReply::Propose {
            operation: self.operation.clone(),
            rationale: Some("again".to_string()),
        })
    }
}

/// Answers only after `delay`.
pub(crate) struct SlowOracle {
    pub delay: Duration,
}

impl ReasoningOracle for SlowOracle {
    async fn propose_next(&self, _request: &OracleRequest) -> Result<OracleReply, OracleError> {
        tokio::time::sleep(self.delay).await;
        Ok(OracleReply::Complete { note: None })
    }
}
