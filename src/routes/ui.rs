use axum::{response::Html, routing::get, Router};

const MAX_UPLOAD_PLACEHOLDER: &str = "{{MAX_UPLOAD_BYTES}}";
const MAX_UPLOAD_MB_PLACEHOLDER: &str = "{{MAX_UPLOAD_MB}}";

pub fn router(max_upload_bytes: usize) -> Router {
    let page = render_page(max_upload_bytes);
    Router::new().route(
        "/",
        get(move || {
            let page = page.clone();
            async move { Html(page) }
        }),
    )
}

fn render_page(max_upload_bytes: usize) -> String {
    INDEX_HTML
        .replace(MAX_UPLOAD_PLACEHOLDER, &max_upload_bytes.to_string())
        .replace(
            MAX_UPLOAD_MB_PLACEHOLDER,
            &(max_upload_bytes / (1024 * 1024)).to_string(),
        )
}

const INDEX_HTML: &str = r##"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Metadata Creator</title>
  <style>
    :root { --tfl-blue: #0019A8; --tfl-red: #DC241F; --tfl-light-blue: #EBF1FF; }
    body {
      margin: 0;
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      background: linear-gradient(to bottom, #EBF1FF 0%, #F5F5F5 100%);
      min-height: 100vh;
    }
    .header {
      background: var(--tfl-blue); color: white; padding: 1rem 2rem;
      display: flex; align-items: center; gap: 1rem;
      box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    }
    .header h1 { margin: 0; font-size: 1.5rem; }
    .roundel {
      position: relative; width: 44px; height: 44px; border-radius: 50%;
      background: var(--tfl-red); display: flex; align-items: center; justify-content: center;
    }
    .roundel::before {
      content: ""; position: absolute; width: 34px; height: 34px;
      border-radius: 50%; background: white;
    }
    .roundel span {
      position: relative; background: var(--tfl-blue); color: white; padding: 4px 8px;
      border-radius: 2px; font: 700 7px Arial, Helvetica, sans-serif; letter-spacing: 0.5px;
    }
    main { max-width: 960px; margin: 0 auto; padding: 2rem; }
    .upload {
      border: 2px dashed var(--tfl-blue); border-radius: 8px; padding: 2rem;
      text-align: center; background: var(--tfl-light-blue); cursor: pointer; margin-bottom: 1rem;
    }
    .upload.dragging { background: white; }
    .upload a { color: var(--tfl-blue); font-weight: bold; }
    #messages { min-height: 400px; max-height: 600px; overflow-y: auto; padding: 1rem; margin-bottom: 1rem; }
    .msg { padding: 1rem; margin: 0.5rem 0; border-radius: 8px; max-width: 80%; }
    .msg.user {
      background: var(--tfl-light-blue); margin-left: auto;
      border: 2px solid var(--tfl-blue); white-space: pre-wrap;
    }
    .msg.assistant { background: white; margin-right: auto; border: 1px solid #e0e0e0; }
    .msg.assistant pre { background: #f6f8fa; padding: 0.75rem; overflow: auto; }
    .spinner-box {
      display: none; padding: 2rem; background: var(--tfl-light-blue);
      border-radius: 12px; margin: 2rem auto; max-width: 300px; text-align: center;
      color: var(--tfl-blue); font-weight: 600; font-size: 1.1rem;
    }
    .spinner-box.active { display: block; }
    .spinner {
      width: 60px; height: 60px; margin: 0 auto 1rem auto; border-radius: 50%;
      border: 5px solid var(--tfl-light-blue); border-top: 5px solid var(--tfl-blue);
      animation: spin 1s linear infinite;
    }
    @keyframes spin { 0% { transform: rotate(0deg); } 100% { transform: rotate(360deg); } }
    .input-row {
      display: flex; gap: 1rem; background: white; border: 2px solid var(--tfl-blue);
      border-radius: 8px; padding: 1rem; box-shadow: 0 2px 8px rgba(0,0,0,0.1);
    }
    textarea { flex: 1; border: none; resize: none; font: inherit; }
    button {
      background: var(--tfl-blue); color: white; border: none; padding: 0.5rem 1.5rem;
      border-radius: 4px; font-weight: 600; cursor: pointer;
    }
    button:hover { background: var(--tfl-red); }
    button:disabled, textarea:disabled { opacity: 0.5; cursor: not-allowed; }
  </style>
</head>
<body>
  <div class="header">
    <div class="roundel"><span>METADATA</span></div>
    <h1>Metadata Creator</h1>
  </div>

  <main>
    <div id="upload" class="upload">
      📎 Drag and Drop or <a>Select Files</a><br />
      <small>CSV, Excel, JSON, TXT (max {{MAX_UPLOAD_MB}}MB)</small>
      <input id="fileInput" type="file" hidden />
    </div>

    <div id="messages"></div>
    <div id="spinner" class="spinner-box"><div class="spinner"></div>⏳ Processing file...</div>

    <div class="input-row">
      <textarea id="messageInput" rows="2" placeholder="Type your message here..."></textarea>
      <button id="sendBtn">Send</button>
    </div>
  </main>

  <script>
    const MAX_UPLOAD_BYTES = {{MAX_UPLOAD_BYTES}};
    const uploadArea = document.getElementById('upload');
    const fileInput = document.getElementById('fileInput');
    const messagesEl = document.getElementById('messages');
    const spinner = document.getElementById('spinner');
    const input = document.getElementById('messageInput');
    const sendBtn = document.getElementById('sendBtn');
    let sessionId = sessionStorage.getItem('metadataSession');
    let busy = false;

    function escapeHtml(text) {
      return text.replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
    }

    function formatAssistant(text) {
      return text.split('```').map((part, i) => {
        if (i % 2 === 1) {
          const body = part.replace(/^[a-zA-Z]*\n/, '');
          return '<pre><code>' + escapeHtml(body) + '</code></pre>';
        }
        return escapeHtml(part)
          .replace(/\*\*(.+?)\*\*/g, '<strong>$1</strong>')
          .replace(/`([^`]+)`/g, '<code>$1</code>')
          .replace(/\n/g, '<br />');
      }).join('');
    }

    function render(messages) {
      messagesEl.innerHTML = '';
      for (const msg of messages) {
        const div = document.createElement('div');
        div.className = 'msg ' + msg.role;
        if (msg.role === 'user') {
          div.textContent = msg.content;
        } else {
          div.innerHTML = formatAssistant(msg.content);
        }
        messagesEl.appendChild(div);
      }
      messagesEl.scrollTop = messagesEl.scrollHeight;
    }

    function setBusy(value) {
      busy = value;
      spinner.classList.toggle('active', value);
      input.disabled = value;
      sendBtn.disabled = value;
    }

    async function ensureSession() {
      if (sessionId) {
        const res = await fetch('/api/sessions/' + sessionId);
        if (res.ok) {
          render((await res.json()).messages);
          return;
        }
      }
      const res = await fetch('/api/sessions', { method: 'POST' });
      sessionId = (await res.json()).session_id;
      sessionStorage.setItem('metadataSession', sessionId);
      render([]);
    }

    async function submit(path, payload) {
      if (busy) return null;
      setBusy(true);
      try {
        const res = await fetch('/api/sessions/' + sessionId + path, {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify(payload)
        });
        const json = await res.json();
        if (!res.ok) {
          alert(json.error || ('Request failed: ' + res.status));
          return null;
        }
        render(json.messages);
        return json;
      } finally {
        setBusy(false);
      }
    }

    function uploadFile(file) {
      if (!file || busy) return;
      if (file.size > MAX_UPLOAD_BYTES) {
        alert(file.name + ' is larger than the upload limit.');
        return;
      }
      const reader = new FileReader();
      reader.onload = () => submit('/uploads', { filename: file.name, contents: reader.result });
      reader.readAsDataURL(file);
    }

    async function sendMessage() {
      const json = await submit('/messages', { message: input.value });
      if (json) input.value = json.input;
    }

    uploadArea.addEventListener('click', () => fileInput.click());
    fileInput.addEventListener('change', () => {
      uploadFile(fileInput.files[0]);
      fileInput.value = '';
    });
    uploadArea.addEventListener('dragover', (e) => { e.preventDefault(); uploadArea.classList.add('dragging'); });
    uploadArea.addEventListener('dragleave', () => uploadArea.classList.remove('dragging'));
    uploadArea.addEventListener('drop', (e) => {
      e.preventDefault();
      uploadArea.classList.remove('dragging');
      uploadFile(e.dataTransfer.files[0]);
    });
    sendBtn.addEventListener('click', sendMessage);
    input.addEventListener('keydown', (e) => {
      if (e.key === 'Enter' && !e.shiftKey) {
        e.preventDefault();
        sendMessage();
      }
    });

    ensureSession();
  </script>
</body>
</html>"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_carries_upload_limit() {
        let page = render_page(100 * 1024 * 1024);
        assert!(page.contains("const MAX_UPLOAD_BYTES = 104857600;"));
        assert!(page.contains("CSV, Excel, JSON, TXT (max 100MB)"));
        assert!(!page.contains("{{"));
    }
}
