pub const INDEX: &str = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Mix Captioner</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            padding: 20px;
        }

        .container {
            background: white;
            border-radius: 20px;
            box-shadow: 0 20px 60px rgba(0,0,0,0.3);
            max-width: 960px;
            margin: 0 auto;
            padding: 40px;
        }

        h1 {
            color: #333;
            margin-bottom: 10px;
            font-size: 2em;
        }

        h2 {
            color: #667eea;
            font-size: 1.1em;
            margin: 25px 0 12px;
            text-transform: uppercase;
            letter-spacing: 1px;
        }

        .subtitle {
            color: #666;
            margin-bottom: 20px;
            font-size: 0.9em;
        }

        .row {
            display: flex;
            gap: 12px;
            flex-wrap: wrap;
            align-items: end;
        }

        label {
            display: flex;
            flex-direction: column;
            gap: 4px;
            color: #555;
            font-size: 0.85em;
            flex: 1;
            min-width: 140px;
        }

        input, select {
            padding: 8px 10px;
            border: 2px solid #e0e3ff;
            border-radius: 8px;
            font-size: 0.95em;
        }

        button {
            background: #667eea;
            color: white;
            border: none;
            border-radius: 20px;
            padding: 10px 22px;
            font-weight: 600;
            cursor: pointer;
        }

        button:disabled {
            background: #aab;
            cursor: wait;
        }

        .tabs {
            display: flex;
            gap: 8px;
            margin-top: 30px;
            border-bottom: 2px solid #f0f0f0;
        }

        .tab {
            background: none;
            color: #667eea;
            border-radius: 10px 10px 0 0;
        }

        .tab.active {
            background: #667eea;
            color: white;
        }

        .panel {
            display: none;
            padding-top: 20px;
        }

        .panel.active {
            display: block;
        }

        .slot {
            background: #f8f9ff;
            border-radius: 12px;
            padding: 14px;
            margin-bottom: 10px;
        }

        .slot select[multiple] {
            height: 90px;
        }

        .status {
            margin-top: 12px;
            font-size: 0.9em;
            color: #666;
        }

        .result {
            background: #f8f9ff;
            border-radius: 10px;
            padding: 20px;
            margin-top: 20px;
            white-space: pre-wrap;
            line-height: 1.6;
            display: none;
        }

        .error {
            background: #fee;
            border: 2px solid #fcc;
            color: #c33;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Mix Captioner</h1>
        <p class="subtitle">Caption images with one prompt, or mix several weighted prompts across a batch.</p>

        <h2>API</h2>
        <div class="row">
            <label>Endpoint <input id="baseUrl" placeholder="http://your-api-server:port/v1"></label>
            <label>API key <input id="apiKey" type="password"></label>
            <label>Model <input id="model" placeholder="auto"></label>
            <button id="testBtn">Test connection</button>
        </div>
        <div class="row" style="margin-top: 10px">
            <label>Temperature <input id="temperature" type="number" min="0" max="2" step="0.05" value="0.9"></label>
            <label>Top-p <input id="topP" type="number" min="0" max="1" step="0.01" value="0.7"></label>
            <label>Max tokens <input id="maxTokens" type="number" min="1" max="512" value="256"></label>
        </div>
        <div class="status" id="connection"></div>

        <div class="tabs">
            <button class="tab active" data-panel="single">Single image</button>
            <button class="tab" data-panel="mix">Mixed batch</button>
        </div>

        <div class="panel active" id="single">
            <div class="slot" id="singleSlot"></div>
            <div class="row">
                <label>Image <input type="file" id="singleFile" accept="image/*"></label>
                <button id="singleBtn">Caption</button>
            </div>
            <div class="result" id="singleResult"></div>
        </div>

        <div class="panel" id="mix">
            <div id="mixSlots"></div>
            <div class="status" id="weightTotal"></div>
            <div class="row">
                <label>Images <input type="file" id="mixFiles" accept="image/*" multiple></label>
                <label>Seed <input id="seed" type="number" placeholder="random"></label>
                <button id="mixBtn">Caption batch</button>
            </div>
            <div class="status" id="mixStatus"></div>
            <div class="result" id="mixResult"></div>
            <a id="download" style="display: none; margin-top: 12px">Download results</a>
        </div>
    </div>

    <script>
        const TYPES = ['descriptive', 'casual', 'straightforward', 'stable-diffusion', 'midjourney', 'art-critic', 'product-listing', 'social-media'];
        const LENGTHS = ['any', 'very short', 'short', 'medium-length', 'long', 'very long'];
        for (let i = 20; i <= 260; i += 10) LENGTHS.push(String(i));
        const EXTRAS = ['lighting', 'camera-angle', 'watermark', 'jpeg-artifacts', 'camera-details', 'keep-pg', 'no-resolution', 'aesthetic-quality', 'composition', 'no-text', 'depth-of-field', 'light-sources', 'no-ambiguity', 'content-rating', 'key-elements-only', 'no-artist', 'orientation', 'shot-type', 'no-mood', 'vantage-height', 'no-meta-phrases'];
        const MIX_DEFAULTS = [
            ['descriptive', 'short', 2.0],
            ['casual', 'short', 1.5],
            ['stable-diffusion', 'short', 0],
            ['art-critic', 'medium-length', 0],
            ['social-media', 'short', 0],
        ];

        const $ = (id) => document.getElementById(id);
        const options = (values, selected) =>
            values.map(v => `<option ${v === selected ? 'selected' : ''}>${v}</option>`).join('');

        function slotHtml(type, length, weight, withWeight) {
            return `<div class="row">
                <label>Caption type <select class="type">${options(TYPES, type)}</select></label>
                <label>Length <select class="length">${options(LENGTHS, length)}</select></label>
                ${withWeight ? `<label>Weight <input class="weight" type="number" min="0" max="10" step="0.1" value="${weight}"></label>` : ''}
                <label>Extras <select class="extras" multiple>${options(EXTRAS)}</select></label>
            </div>`;
        }

        function readSlot(slot) {
            const weight = slot.querySelector('.weight');
            return {
                caption_type: slot.querySelector('.type').value,
                length: slot.querySelector('.length').value,
                extras: [...slot.querySelector('.extras').selectedOptions].map(o => o.value),
                weight: weight ? parseFloat(weight.value || '0') : 1,
            };
        }

        function apiFields() {
            return {
                base_url: $('baseUrl').value,
                api_key: $('apiKey').value,
                model: $('model').value,
                temperature: parseFloat($('temperature').value),
                top_p: parseFloat($('topP').value),
                max_tokens: parseInt($('maxTokens').value, 10),
            };
        }

        function show(el, text, isError) {
            el.textContent = text;
            el.style.display = 'block';
            el.classList.toggle('error', !!isError);
        }

        async function send(url, body, isJson) {
            const response = await fetch(url, {
                method: 'POST',
                headers: isJson ? { 'Content-Type': 'application/json' } : {},
                body: isJson ? JSON.stringify(body) : body,
            });
            const data = await response.json();
            if (!response.ok) throw new Error(data.error || 'request failed');
            return data;
        }

        $('singleSlot').innerHTML = slotHtml('descriptive', 'short', 1, false);
        $('mixSlots').innerHTML = MIX_DEFAULTS
            .map(([t, l, w]) => `<div class="slot mix-slot">${slotHtml(t, l, w, true)}</div>`)
            .join('');

        function updateWeightTotal() {
            const total = [...document.querySelectorAll('.mix-slot')]
                .map(readSlot)
                .reduce((sum, s) => sum + (s.weight > 0 ? s.weight : 0), 0);
            $('weightTotal').textContent = `Total weight: ${total.toFixed(1)}`;
        }
        document.querySelectorAll('.weight').forEach(w => w.addEventListener('input', updateWeightTotal));
        updateWeightTotal();

        document.querySelectorAll('.tab').forEach(tab => tab.addEventListener('click', () => {
            document.querySelectorAll('.tab, .panel').forEach(el => el.classList.remove('active'));
            tab.classList.add('active');
            $(tab.dataset.panel).classList.add('active');
        }));

        $('testBtn').addEventListener('click', async () => {
            try {
                const data = await send('/api/test-connection', apiFields(), true);
                $('connection').textContent = `Connected. Available model: ${data.model}`;
            } catch (error) {
                $('connection').textContent = `Connection failed: ${error.message}`;
            }
        });

        $('singleBtn').addEventListener('click', async () => {
            const file = $('singleFile').files[0];
            if (!file) return show($('singleResult'), 'Please upload an image first', true);

            const form = new FormData();
            form.append('image', file);
            form.append('prompt', JSON.stringify(readSlot($('singleSlot'))));
            form.append('api', JSON.stringify(apiFields()));

            $('singleBtn').disabled = true;
            show($('singleResult'), 'Generating caption...');
            try {
                const data = await send('/api/caption', form);
                show($('singleResult'), `${data.caption}\n\n(${data.processing_time_ms} ms)`);
            } catch (error) {
                show($('singleResult'), 'Error: ' + error.message, true);
            } finally {
                $('singleBtn').disabled = false;
            }
        });

        $('mixBtn').addEventListener('click', async () => {
            const files = [...$('mixFiles').files];
            const form = new FormData();
            files.forEach(f => form.append('images', f));
            form.append('prompts', JSON.stringify([...document.querySelectorAll('.mix-slot')].map(readSlot)));
            form.append('api', JSON.stringify(apiFields()));
            form.append('seed', $('seed').value);

            $('mixBtn').disabled = true;
            $('download').style.display = 'none';
            $('mixStatus').textContent = `Captioning ${files.length} images...`;
            try {
                const data = await send('/api/batch', form);
                $('mixStatus').textContent = `${data.result.succeeded}/${data.result.total} succeeded in ${data.processing_time_ms} ms`;
                show($('mixResult'), data.summary);
                const link = $('download');
                link.href = `data:application/zip;base64,${data.archive_base64}`;
                link.download = data.archive_name;
                link.style.display = 'inline-block';
            } catch (error) {
                $('mixStatus').textContent = '';
                show($('mixResult'), 'Error: ' + error.message, true);
            } finally {
                $('mixBtn').disabled = false;
            }
        });
    </script>
</body>
</html>
"#;
